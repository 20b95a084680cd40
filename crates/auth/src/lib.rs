//! `stockhistory-auth`: who the caller is and what they may do.
//!
//! The host application authenticates users and issues signed tokens; this
//! crate validates them and answers "may this caller do X". It is decoupled
//! from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod groups;
pub mod jwt;
pub mod permissions;
pub mod principal;

pub use authorize::{AccessPolicy, AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use groups::Group;
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use permissions::Permission;
pub use principal::Principal;
