use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Why a token failed verification.
///
/// Malformed and tampered tokens both report `InvalidSignature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
}

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token, the owning user's id.
    pub sub: Uuid,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Unique token id. Two tokens minted for the same user in the same
    /// second still differ.
    pub jti: Uuid,
    /// Expiration timestamp, present only when a lifetime is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Mints and verifies HS256 session tokens with a fixed secret.
///
/// Verification is a pure function of the secret and the token bytes.
/// Whether a token was revoked is decided by the store, not here.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Option<Duration>,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Option<Duration>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Produces a signed token for `user_id`.
    ///
    /// The caller is responsible for recording the token on the user.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = match self.ttl {
            Some(ttl) => Some(
                now.checked_add_signed(ttl)
                    .ok_or_else(|| {
                        AppError::InternalServerError("token lifetime overflows the calendar".into())
                    })?
                    .timestamp(),
            ),
            None => None,
        };
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Checks signature and expiry and returns the subject.
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        self.decode_claims(token).map(|claims| claims.sub)
    }

    pub fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        if self.ttl.is_none() {
            validation.required_spec_claims.remove("exp");
        }

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidSignature,
            })
    }
}
