use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Numeric id of the authenticated caller.
pub fn caller_id(user: &User) -> Result<i64, AppError> {
    user.user_id()
        .ok_or_else(|| AppError::Auth("Token subject is not a valid user id".to_string()))
}

pub fn require_role(user: &User, role: UserRole) -> Result<(), AppError> {
    if user.user_role() != Some(role) {
        return Err(AppError::Forbidden(format!("Only {} users can perform this action", role)));
    }
    Ok(())
}
