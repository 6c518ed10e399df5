use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{UserProfile, UserRole};

/// JWT claims issued by the identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id
    pub sub: String,
    pub role: String,
    /// Expiration (unix timestamp), enforced by validation
    pub exp: i64,
}

/// Validate an HS256 bearer token and return its claims.
pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
}

/// Resolve a raw credential to a public profile: validate the token, then
/// confirm the subject still exists (and is active) in the user store. Used
/// by the channel handshake, where the role must come from the store rather
/// than a possibly stale claim.
pub async fn resolve_identity(db: &PgPool, secret: &str, token: &str) -> AppResult<UserProfile> {
    let claims = verify_token(token, secret)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

    let row = sqlx::query("SELECT id, name, role FROM users WHERE id = $1 AND is_active = true")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let role_str: String = row.get("role");
    let role = UserRole::parse(&role_str).ok_or(AppError::Unauthorized)?;

    Ok(UserProfile {
        id: row.get("id"),
        name: row.get("name"),
        role,
    })
}

/// Caller identity extracted from the Authorization header.
///
/// Handlers take this by value; extraction fails with 401 when the header is
/// missing or the token does not validate.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedUser {
    /// Reject non-admin-class callers on elevated endpoints.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.role.is_admin_class() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_user(req))
    }
}

fn extract_user(req: &HttpRequest) -> AppResult<AuthenticatedUser> {
    let config = req
        .app_data::<web::Data<Config>>()
        .ok_or(AppError::Internal)?;

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_token(token, &config.auth.jwt_secret)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;
    let role = UserRole::parse(&claims.role).ok_or(AppError::Unauthorized)?;

    Ok(AuthenticatedUser { user_id, role })
}
