use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::app::AppState;
use crate::error::ApiError;
use crate::types::Actor;

/// Middleware that checks the token holder still exists in the accounts
/// table and replaces the token's claims with the stored identity, so a
/// demoted or deleted account loses access immediately.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let AuthUser(claimed) = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let actor = state.accounts.resolve_actor(claimed.id).await?.ok_or_else(|| {
        tracing::warn!("User validation failed: account #{} no longer exists", claimed.id);
        ApiError::unauthorized("Account no longer exists")
    })?;

    if actor.email != claimed.email {
        tracing::warn!("User validation failed: token email does not match account #{}", actor.id);
        return Err(ApiError::unauthorized("Token no longer matches account, please log in again"));
    }

    tracing::debug!("User validation successful: account #{} ({})", actor.id, actor.role);
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

/// Middleware that only lets administrators through. Must run after
/// `validate_user_middleware`.
pub async fn require_admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let actor = request
        .extensions()
        .get::<Actor>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !actor.is_admin() {
        tracing::warn!("Account #{} denied admin route {}", actor.id, request.uri().path());
        return Err(ApiError::forbidden("Administrator access required"));
    }

    Ok(next.run(request).await)
}
