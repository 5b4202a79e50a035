use axum::extract::{Path, State};
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::{ARTICLES, PRODUCTS};
use crate::database::Record;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/products/category/:tag - Products carrying a category tag
pub async fn products_by_category(State(state): State<AppState>, Path(tag): Path<String>) -> ApiResult<Vec<Record>> {
    let products = state
        .resources
        .list_where(&PRODUCTS, "category", Value::String(tag), false)
        .await?;
    Ok(ApiResponse::success(products))
}

/// GET /api/articles/status/:status - Articles in one status, newest first
pub async fn articles_by_status(State(state): State<AppState>, Path(status): Path<String>) -> ApiResult<Vec<Record>> {
    let articles = state
        .resources
        .list_where(&ARTICLES, "status", Value::String(status), true)
        .await?;
    Ok(ApiResponse::success(articles))
}
