use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockhistory_core::UserId;

use crate::{Group, Permission};

/// Token claims issued by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Host user id.
    pub sub: UserId,

    pub username: String,

    /// Groups the user belongs to in the host.
    #[serde(default)]
    pub groups: Vec<Group>,

    /// Staff users may change settings and trigger runs.
    #[serde(default)]
    pub is_staff: bool,

    /// Extra permissions granted directly to the user.
    #[serde(default)]
    pub permissions: Vec<Permission>,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Validate the time window of the claims.
///
/// Signature verification happens in [`crate::jwt`]; this only checks the
/// decoded claims.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
