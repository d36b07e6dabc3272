use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rentora_core::identity::UserRole;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub exp: usize,
}

impl Claims {
    /// Route-level role gate; handlers declare who may call them.
    pub fn authorize(&self, roles: &[UserRole]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::AuthorizationError(format!(
                "Access denied. You do not have {} privileges.",
                roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join("/")
            )))
        }
    }
}

/// Claims are injected by the auth middleware; handlers extract them as an
/// argument.
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::AuthenticationError("Missing authentication".to_string()))
    }
}

// ============================================================================
// Middleware
// ============================================================================

fn decode_bearer(req: &Request, secret: &str) -> Result<Claims, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("Invalid or expired token".to_string()))?;

    Ok(token_data.claims)
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = decode_bearer(&req, &state.auth.secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Admin surfaces get their own gate on top of token validity.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = decode_bearer(&req, &state.auth.secret)?;
    claims.authorize(&[UserRole::Admin])?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn claims(role: UserRole, exp_offset: i64) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            name: "Priya".to_string(),
            email: "priya@example.com".to_string(),
            role,
            exp: (Utc::now() + Duration::seconds(exp_offset)).timestamp() as usize,
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn token_round_trips() {
        let original = claims(UserRole::Lender, 3600);
        let token = sign(&original, "secret");

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, original.sub);
        assert_eq!(decoded.claims.role, UserRole::Lender);
    }

    #[test]
    fn expired_token_is_rejected() {
        let stale = claims(UserRole::Renter, -3600);
        let token = sign(&stale, "secret");

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign(&claims(UserRole::Renter, 3600), "secret");
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn authorize_checks_role_membership() {
        let lender = claims(UserRole::Lender, 3600);
        assert!(lender.authorize(&[UserRole::Lender, UserRole::Renter]).is_ok());
        assert!(lender.authorize(&[UserRole::Admin]).is_err());
    }
}
