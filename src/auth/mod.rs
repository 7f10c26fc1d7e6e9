pub mod password;
pub mod revocation;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::models::{Role, Subrole, User};

pub use password::{hash_password, verify_password};
pub use revocation::RevocationList;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No bearer token presented")]
    MissingToken,
    #[error("Token is malformed, forged or expired")]
    InvalidToken,
    #[error("Token has been revoked")]
    Revoked,
    #[error("Role not permitted")]
    Forbidden,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("JWT secret not configured")]
    SecretMissing,
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Password hashing error: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    pub role: Role,
    pub subrole: Option<Subrole>,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed token and its lifetime in seconds.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Signs and verifies HS256 session tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl TokenService {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::SecretMissing);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours as i64),
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, AuthError> {
        Self::new(&security.jwt_secret, security.jwt_expiry_hours)
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user.meta.id,
            role: user.role,
            subrole: user.subrole,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        self.sign(&claims).map(|token| IssuedToken {
            token,
            expires_in: self.expiry.num_seconds(),
        })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Check signature and expiry. Revocation is checked separately.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected token: {}", e);
                AuthError::InvalidToken
            })
    }
}
