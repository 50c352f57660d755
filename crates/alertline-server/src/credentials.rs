//! Password hashing and bearer token issuance/verification.
//!
//! Passwords are hashed with bcrypt on the blocking thread pool. Tokens are
//! HS256 JWTs carrying the principal id and role; they are stateless, so a
//! role change takes effect when the holder next logs in.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use alertline_shared::Role;

use crate::config::ServerConfig;
use crate::error::ApiError;

/// Claims embedded in every bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller, attached to request extensions by the access
/// gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.id,
            role: claims.role,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token missing")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::Unauthorized(err.to_string()),
            AuthError::InvalidToken(_) => ApiError::Forbidden(err.to_string()),
            AuthError::Hashing(_) | AuthError::Signing(_) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Process-wide credential service. Cheap to clone.
#[derive(Clone)]
pub struct CredentialService {
    inner: Arc<Inner>,
}

struct Inner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    token_ttl_secs: i64,
    bcrypt_cost: u32,
}

impl CredentialService {
    pub fn new(secret: &[u8], token_ttl_secs: i64, bcrypt_cost: u32) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            inner: Arc::new(Inner {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                validation,
                token_ttl_secs,
                bcrypt_cost,
            }),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.token_secret.as_bytes(),
            config.token_ttl_secs,
            config.bcrypt_cost,
        )
    }

    // ------------------------------------------------------------------
    // Passwords
    // ------------------------------------------------------------------

    pub async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let cost = self.inner.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Compare a candidate password with a stored hash. A malformed hash is
    /// treated as a mismatch.
    pub async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        Ok(matched.unwrap_or_else(|e| {
            debug!(error = %e, "Stored hash could not be parsed");
            false
        }))
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    pub fn issue_token(&self, id: Uuid, role: Role) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        self.encode_claims(&Claims {
            id,
            role,
            iat: now,
            exp: now + self.inner.token_ttl_secs,
        })
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.inner.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Check signature and expiry, returning the embedded claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.inner.decoding, &self.inner.validation)
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CredentialService {
        CredentialService::new(b"test-secret", 3600, 4)
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let svc = service();
        let hash = svc.hash_password("secret1".into()).await.unwrap();
        assert_ne!(hash, "secret1");

        assert!(svc
            .verify_password("secret1".into(), hash.clone())
            .await
            .unwrap());
        assert!(!svc.verify_password("wrong".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_mismatch() {
        let svc = service();
        assert!(!svc
            .verify_password("secret1".into(), "not-a-bcrypt-hash".into())
            .await
            .unwrap());
    }

    #[test]
    fn test_token_round_trip() {
        let svc = service();
        let id = Uuid::new_v4();
        let token = svc.issue_token(id, Role::Admin).unwrap();

        let claims = svc.verify_token(&token).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service();
        let now = Utc::now().timestamp();
        let token = svc
            .encode_claims(&Claims {
                id: Uuid::new_v4(),
                role: Role::User,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();

        let err = svc.verify_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
        assert_eq!(ApiError::from(err).status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = CredentialService::new(b"another-secret", 3600, 4);
        let token = other.issue_token(Uuid::new_v4(), Role::Admin).unwrap();
        assert!(service().verify_token(&token).is_err());
        assert!(service().verify_token("garbage").is_err());
    }
}
