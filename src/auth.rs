use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::User;
use crate::repository::RepositoryState;

/// Claims
///
/// The JWT payload issued to a signed-in user. `sub` carries the user id; the
/// remaining identity fields ride along so clients can display who is signed in
/// without another round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the user, used to load the live user record
    /// on every authenticated request.
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    /// Issued At (iat): timestamp when the JWT was signed.
    pub iat: usize,
    /// Expiration Time (exp): timestamp after which the JWT must not be accepted.
    pub exp: usize,
}

/// InvalidToken
///
/// Every verification failure (bad signature, expired, malformed) collapses into
/// this one error so responses never reveal which check rejected the token.
#[derive(Debug, Error)]
#[error("Invalid token")]
pub struct InvalidToken;

/// issue_token
///
/// Signs a JWT for the given user, valid for `ttl_days` from now.
pub fn issue_token(
    user: &User,
    secret: &str,
    ttl_days: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::days(ttl_days)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// verify_token
///
/// Decodes a JWT, checking the signature and expiration, and returns its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, InvalidToken> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();

    // Ensure expiration time validation is always active.
    validation.validate_exp = true;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|_| InvalidToken)
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers take this as an
/// argument to make themselves protected, and read it for ownership checks.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// The user's role, 'user' or 'admin'. Used for Role-Based Access Control (RBAC).
    pub role: String,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a function
/// argument in any authenticated handler. The flow is:
/// 1. Token Extraction: standard Bearer token retrieval from the Authorization header.
/// 2. Token Validation: JWT decoding against the configured secret.
/// 3. DB Lookup: fetching the user's current record, which is what lets revocation
///    work. A deleted or deactivated account is rejected even while its token is
///    still inside the expiry window.
///
/// Rejection: ApiError::Unauthorized (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    // S must allow sending across threads and sharing.
    S: Send + Sync,
    // Allows the extractor to pull the Repository State from the app state.
    RepositoryState: FromRef<S>,
    // Allows the extractor to pull the AppConfig (for the JWT secret).
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Token Extraction
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                ApiError::Unauthorized("Access denied. No token provided.".to_string())
            })?;

        // 2. Token Validation
        let config = AppConfig::from_ref(state);
        let claims = verify_token(token, &config.jwt_secret)
            .map_err(|_| ApiError::Unauthorized("Invalid token.".to_string()))?;

        // 3. Database Lookup (Final Verification)
        let repo = RepositoryState::from_ref(state);
        let user = repo
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid token. User not found.".to_string()))?;

        if !user.is_active {
            return Err(ApiError::Unauthorized("Account is deactivated.".to_string()));
        }

        // Success: return the resolved identity.
        Ok(AuthUser {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        })
    }
}

/// can_modify
///
/// Ownership check for post mutations: authors may modify their own posts, and
/// admins may modify anything.
pub fn can_modify(user: &AuthUser, author_id: Uuid) -> bool {
    user.id == author_id || user.role == "admin"
}

/// require_role
///
/// Restricts an operation to callers holding one of the listed roles.
pub fn require_role(user: &AuthUser, roles: &[&str]) -> Result<(), ApiError> {
    if roles.contains(&user.role.as_str()) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Access denied. Insufficient permissions.".to_string(),
        ))
    }
}
