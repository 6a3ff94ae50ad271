// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::user::{Caller, Role},
    services::AuthVerifier,
};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID.
    pub sub: String,
    /// Display name, shown as the creator of the user's posts.
    pub name: String,
    pub role: Role,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller {
            id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(
    id: &str,
    name: &str,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_owned(),
        name: name.to_owned(),
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(token_data.claims)
}

/// `AuthVerifier` backed by HS256 tokens signed with a shared secret.
///
/// Accepts either the bare token or an `Authorization` header value of the
/// form `Bearer <token>`.
#[derive(Clone)]
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl AuthVerifier for JwtVerifier {
    async fn verify(&self, token: Option<&str>) -> Result<Caller, AppError> {
        let raw = token.map(str::trim).unwrap_or_default();
        let raw = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();

        if raw.is_empty() {
            return Err(AppError::Unauthenticated);
        }

        verify_jwt(raw, &self.secret).map(Caller::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "jwt_unit_test_secret";

    #[tokio::test]
    async fn resolves_caller_from_signed_token() {
        let token = sign_jwt("u1", "alice", Role::Admin, SECRET, 600).unwrap();
        let verifier = JwtVerifier::new(SECRET);

        let caller = verifier.verify(Some(&token)).await.unwrap();
        assert_eq!(caller.id, "u1");
        assert_eq!(caller.name, "alice");
        assert!(caller.is_admin());

        let header = format!("Bearer {}", token);
        assert_eq!(verifier.verify(Some(&header)).await.unwrap(), caller);
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated() {
        let verifier = JwtVerifier::new(SECRET);

        assert!(matches!(
            verifier.verify(None).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            verifier.verify(Some("  ")).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            verifier.verify(Some("Bearer ")).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn bad_tokens_are_invalid() {
        let verifier = JwtVerifier::new(SECRET);
        let foreign = sign_jwt("u1", "alice", Role::User, "another_secret", 600).unwrap();

        assert!(matches!(
            verifier.verify(Some("not-a-jwt")).await,
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            verifier.verify(Some(&foreign)).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize;
        let claims = Claims {
            sub: "u1".into(),
            name: "alice".into(),
            role: Role::User,
            // Well past the default 60s leeway.
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(verify_jwt(&token, SECRET), Err(AppError::InvalidToken)));
    }
}
