//! # Authentication
//!
//! Session tokens, password hashing and the request guards.
//!
//! ## Session Model
//! ```text
//! POST /auth/login ──► verify argon2 hash ──► sign JWT ──► users.current_token = JWT
//!
//! any protected request
//!     │  Authorization: Bearer <JWT>
//!     ▼
//! require_auth: signature + expiry ──► live user ──► token == current_token ──► Actor
//! ```
//!
//! Only the most recently issued token is accepted, so logging in again (or
//! logging out) ends every earlier session of that user.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use pos_core::{Role, User};

use crate::error::ApiError;
use crate::AppState;

// =============================================================================
// Tokens
// =============================================================================

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Role at issue time. Authorization uses the stored role.
    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID, unique per login
    pub jti: String,
}

/// Signs and verifies HS256 session tokens.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: impl Into<String>, lifetime_secs: i64) -> Self {
        JwtManager {
            secret: secret.into(),
            lifetime_secs,
        }
    }

    /// Issues a token for `user`.
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {e}")))
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("Rejected token: {}", e);
            ApiError::unauthorized("invalid or expired token")
        })
    }
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

/// Hashes a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))
}

/// `false` for a wrong password or an unreadable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

// =============================================================================
// Guards
// =============================================================================

/// The authenticated user behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

/// Resolves the bearer token to an [`Actor`] and stores it in the request
/// extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?
        .to_string();

    let claims = state.jwt.verify(&token)?;
    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::unauthorized("invalid or expired token"))?;

    let user = state
        .db
        .users()
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("user no longer exists"))?;

    if user.current_token.as_deref() != Some(token.as_str()) {
        warn!(user_id = user.id, "Rejected superseded session token");
        return Err(ApiError::unauthorized("session has ended, please log in again"));
    }

    request.extensions_mut().insert(Actor {
        user_id: user.id,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Lets only admins through. Must run inside [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let actor = request
        .extensions()
        .get::<Actor>()
        .copied()
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;

    if actor.role != Role::Admin {
        warn!(user_id = actor.user_id, "Rejected non-admin on admin route");
        return Err(ApiError::forbidden("admin access required"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            username: "kasir1".to_string(),
            password_hash: String::new(),
            role,
            full_name: "Kasir Satu".to_string(),
            current_token: None,
            created_by: None,
            updated_by: None,
            deleted_by: None,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret", 3600);

        let token = manager.issue(&user(7, Role::Cashier)).unwrap();
        let claims = manager.verify(&token).unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, Role::Cashier);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_tokens_are_unique_per_issue() {
        let manager = JwtManager::new("test-secret", 3600);
        let u = user(7, Role::Cashier);

        assert_ne!(manager.issue(&u).unwrap(), manager.issue(&u).unwrap());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtManager::new("one", 3600)
            .issue(&user(1, Role::Admin))
            .unwrap();

        let err = JwtManager::new("two", 3600).verify(&token).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Unauthorized);
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret", -3600);
        let token = manager.issue(&user(1, Role::Admin)).unwrap();

        assert!(manager.verify(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("rahasia123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("rahasia123", &hash));
        assert!(!verify_password("salah", &hash));
        assert!(!verify_password("rahasia123", "not-a-phc-string"));
    }
}
