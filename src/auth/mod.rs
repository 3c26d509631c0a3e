//! Authentication for the storefront API.
//!
//! Requests carry a signed JWT bearer token. The middleware resolves the
//! token to an [`AuthUser`] once per request; handlers receive it through an
//! extractor. Role checks live in [`rbac`].

use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::errors::ServiceError;
use crate::AppState;

pub mod rbac;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    /// Unique identifier for this token
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Identity resolved from the request credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_expiry: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        issuer: String,
        audience: String,
        token_expiry: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            issuer,
            audience,
            token_expiry,
        }
    }
}

/// Issues and validates bearer tokens; owns password hashing.
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issues a signed token for the given account.
    pub fn generate_token(&self, account: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account.id.to_string(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.config.token_expiry.as_secs() as i64,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("token creation failed: {e}")))
    }

    /// Validates a token and resolves it to an identity.
    pub fn validate_token(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| ServiceError::Unauthorized("Invalid or expired token".to_string()))?;

        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".to_string()))?;

        Ok(AuthUser {
            id,
            name: data.claims.name,
            email: data.claims.email,
            role: data.claims.role,
        })
    }

    pub fn hash_password(password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))
    }

    pub fn verify_password(password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

/// Resolves the bearer credential once per request and stores the identity in
/// the request extensions. Routes behind this layer reject anonymous callers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers().clone();

    match resolve_identity(&headers, &state.auth) {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn resolve_identity(headers: &HeaderMap, auth: &AuthService) -> Result<AuthUser, ServiceError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("Missing authentication token".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ServiceError::Unauthorized("Malformed authorization header".to_string()))?;

    auth.validate_token(token.trim())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "a".repeat(64),
            "storefront-api".to_string(),
            "storefront-clients".to_string(),
            Duration::from_secs(3600),
        ))
    }

    fn test_account(role: UserRole) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            role,
            phone: None,
            address: None,
            city: None,
            state: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let service = test_service();
        let account = test_account(UserRole::Admin);

        let token = service.generate_token(&account).unwrap();
        let resolved = service.validate_token(&token).unwrap();

        assert_eq!(resolved.id, account.id);
        assert_eq!(resolved.email, account.email);
        assert!(resolved.is_admin());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = test_service();
        let token = service.generate_token(&test_account(UserRole::Customer)).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(service.validate_token(&tampered).is_err());
    }

    #[test]
    fn token_from_a_different_secret_is_rejected() {
        let issuer = test_service();
        let other = AuthService::new(AuthConfig::new(
            "b".repeat(64),
            "storefront-api".to_string(),
            "storefront-clients".to_string(),
            Duration::from_secs(3600),
        ));
        let token = issuer.generate_token(&test_account(UserRole::Customer)).unwrap();
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = AuthService::hash_password("hunter2hunter2").unwrap();
        assert!(AuthService::verify_password("hunter2hunter2", &hash));
        assert!(!AuthService::verify_password("wrong", &hash));
        assert!(!hash.contains("hunter2"));
    }
}
