use axum::extract::{Extension, Path, State};
use serde_json::{json, Value};

use super::payload::Payload;
use crate::app::AppState;
use crate::database::models::{ACCOUNTS, ARTICLES, CATEGORIES, PRODUCTS};
use crate::database::{FieldSet, Record, ResourceSchema};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Actor;

/// Binds a route to the schema it serves
pub trait Resource: Send + Sync + 'static {
    fn schema() -> &'static ResourceSchema;
}

pub struct Users;
pub struct Categories;
pub struct Products;
pub struct Articles;

impl Resource for Users {
    fn schema() -> &'static ResourceSchema {
        &ACCOUNTS
    }
}

impl Resource for Categories {
    fn schema() -> &'static ResourceSchema {
        &CATEGORIES
    }
}

impl Resource for Products {
    fn schema() -> &'static ResourceSchema {
        &PRODUCTS
    }
}

impl Resource for Articles {
    fn schema() -> &'static ResourceSchema {
        &ARTICLES
    }
}

/// GET /api/:resource - List all records
pub async fn list<R: Resource>(State(state): State<AppState>) -> ApiResult<Vec<Record>> {
    let records = state.resources.list(R::schema()).await?;
    Ok(ApiResponse::success(records))
}

/// GET /api/:resource/:id - Read one record
pub async fn show<R: Resource>(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Record> {
    let record = state.resources.get(R::schema(), &id).await?;
    Ok(ApiResponse::success(record))
}

/// POST /api/:resource - Create a record (JSON or multipart)
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Payload { body, uploads }: Payload,
) -> ApiResult<Record> {
    uploads.check(R::schema())?;
    let fields = FieldSet::from_json(R::schema(), body)?;
    let record = state.resources.create(R::schema(), fields, Some(&actor)).await?;
    uploads.commit(state.media.as_ref(), &record).await?;
    Ok(ApiResponse::created(record))
}

/// PUT /api/:resource/:id - Update only the supplied fields
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Payload { body, uploads }: Payload,
) -> ApiResult<Record> {
    uploads.check(R::schema())?;
    let fields = FieldSet::from_json(R::schema(), body)?;
    let record = state.resources.update(R::schema(), &id, fields, Some(&actor)).await?;
    uploads.commit(state.media.as_ref(), &record).await?;
    Ok(ApiResponse::success(record))
}

/// DELETE /api/:resource/:id - Hard delete
pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let schema = R::schema();
    let deleted = state.resources.delete(schema, &id, Some(&actor)).await?;
    Ok(ApiResponse::success(json!({
        "id": deleted,
        "message": format!("{} deleted successfully", schema.label),
    })))
}
