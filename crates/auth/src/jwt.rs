//! Bearer token decoding and signature verification.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Turns a raw bearer token into validated claims.
pub trait JwtValidator: Send + Sync + 'static {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// HMAC-SHA256 validator with a shared secret.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry lives in `expires_at` (RFC 3339), checked by `validate_claims`.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};
    use stockhistory_core::UserId;

    fn mint(secret: &[u8], expires_in: Duration) -> String {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: UserId::new(3),
            username: "bob".to_string(),
            groups: vec![crate::Group::new("inventory")],
            is_staff: false,
            permissions: vec![],
            issued_at: now - Duration::seconds(1),
            expires_at: now + expires_in,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret))
            .unwrap()
    }

    #[test]
    fn round_trips_a_signed_token() {
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let claims = v.validate(&mint(b"s3cret", Duration::minutes(5)), Utc::now()).unwrap();
        assert_eq!(claims.username, "bob");
        assert_eq!(claims.groups[0].as_str(), "inventory");
    }

    #[test]
    fn rejects_wrong_secret() {
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let err = v.validate(&mint(b"other", Duration::minutes(5)), Utc::now()).unwrap_err();
        assert!(matches!(err, JwtError::Decode(_)));
    }

    #[test]
    fn rejects_expired_token() {
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let token = mint(b"s3cret", Duration::minutes(5));
        let later = Utc::now() + Duration::minutes(10);
        let err = v.validate(&token, later).unwrap_err();
        assert!(matches!(err, JwtError::Claims(TokenValidationError::Expired)));
    }
}
