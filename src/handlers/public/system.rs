use axum::{
    extract::State,
    http::{Method, Uri},
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - Service banner
pub async fn root() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "auth": ["/api/auth/register", "/api/auth/login", "/api/auth/profile"],
            "users": "/api/users",
            "categories": "/api/categories",
            "products": "/api/products",
            "articles": "/api/articles"
        }
    })))
}

/// GET /health - Store connectivity
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::service_unavailable("Database unavailable")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "database": "connected",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

/// Any unmatched route
pub async fn fallback(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} {} not found", method, uri.path()))
}
