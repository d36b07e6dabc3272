use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rentora_core::identity::{UserAccount, UserRole};
use rentora_core::pagination::{PageParams, Paginated};

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::{AppState, AuthConfig};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserAccount,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FindUsersQuery {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub role: Option<UserRole>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/all", get(all_users))
        .route("/users", get(find_users))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserAccount>), AppError> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    if req.name.trim().is_empty() {
        return Err(AppError::ValidationError("name must not be empty".to_string()));
    }

    let hash = hash_password(&req.password)?;
    let account = state
        .users
        .create_user(req.name.trim(), &req.email, &hash, req.role)
        .await?;

    tracing::info!(user_id = %account.id, role = %account.role, "account registered");
    Ok((StatusCode::CREATED, Json(account)))
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (account, stored_hash) = state
        .users
        .find_credentials(&req.email, req.role)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("Unknown email for this role".to_string()))?;

    if !verify_password(&req.password, &stored_hash) {
        return Err(AppError::AuthenticationError("Incorrect password".to_string()));
    }

    let token = issue_token(&account, &state.auth)?;
    Ok(Json(LoginResponse { token, user: account }))
}

/// GET /users/all
async fn all_users(
    State(state): State<AppState>,
    _claims: Claims,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Paginated<UserAccount>>, AppError> {
    let page = PageParams { limit: query.limit, page: query.page }
        .with_default_limit(state.default_page_limit);
    let users = state.users.list_users(page).await?;
    Ok(Json(users))
}

/// GET /users?id=..|name=..|role=..
async fn find_users(
    State(state): State<AppState>,
    _claims: Claims,
    Query(query): Query<FindUsersQuery>,
) -> Result<Json<Vec<UserAccount>>, AppError> {
    let users = state
        .users
        .find_users(query.id, query.name.as_deref(), query.role)
        .await?;
    if users.is_empty() {
        return Err(AppError::NotFoundError("No matching users".to_string()));
    }
    Ok(Json(users))
}

// ============================================================================
// Helpers
// ============================================================================

pub fn issue_token(account: &UserAccount, auth: &AuthConfig) -> Result<String, AppError> {
    let claims = Claims {
        sub: account.id,
        name: account.name.clone(),
        email: account.email.clone(),
        role: account.role,
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {e}")))
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {e}")))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email.contains('@') && email.split('@').nth(1).is_some_and(|d| d.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(AppError::ValidationError("invalid email address".to_string()))
    }
}

/// At least 4 characters with a letter, a digit, and a special character.
fn validate_password(password: &str) -> Result<(), AppError> {
    let long_enough = password.len() >= 4;
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| "@$!%*?&".contains(c));

    if long_enough && has_letter && has_digit && has_special {
        Ok(())
    } else {
        Err(AppError::ValidationError(
            "password needs a letter, a digit, and one of @$!%*?&".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_policy_enforced() {
        assert!(validate_password("a1@x").is_ok());
        assert!(validate_password("abc").is_err());
        assert!(validate_password("abcd1234").is_err()); // no special
        assert!(validate_password("@$!%").is_err()); // no letter or digit
    }

    #[test]
    fn email_shape_checked() {
        assert!(validate_email("lena@example.com").is_ok());
        assert!(validate_email("lena@example").is_err());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("hunter2!0k").unwrap();
        assert!(verify_password("hunter2!0k", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("hunter2!0k", "not-a-phc-string"));
    }
}
