//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// - `Money { amount: 10, currency: USD }` is a value object
/// - `StockHistoryEntry { pk: 7, .. }` is an entity
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
