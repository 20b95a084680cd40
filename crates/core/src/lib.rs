//! `stockhistory-core`: identifiers, money and the domain error type.
//!
//! Shared by every other crate. Pure values only: no IO, no async.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{EntryId, PartId, UserId};
pub use money::{Currency, ExchangeRates, Money};
pub use value_object::ValueObject;
