//! Entity trait: records with a store-assigned identity.

/// Anything persisted with its own identifier.
///
/// Two entities with the same id are the same record, even if one of them is
/// a stale copy.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
