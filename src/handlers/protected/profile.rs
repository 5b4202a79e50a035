use axum::extract::{Extension, State};

use crate::app::AppState;
use crate::database::models::ACCOUNTS;
use crate::database::{FieldSet, Record};
use crate::handlers::Payload;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Actor;

/// GET /api/auth/profile - The caller's own account
pub async fn show(State(state): State<AppState>, Extension(actor): Extension<Actor>) -> ApiResult<Record> {
    let account = state.accounts.profile(&actor).await?;
    Ok(ApiResponse::success(account))
}

/// PUT /api/auth/profile - Partial update of the caller's own account
pub async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Payload { body, uploads }: Payload,
) -> ApiResult<Record> {
    uploads.check(&ACCOUNTS)?;
    let fields = FieldSet::from_json(&ACCOUNTS, body)?;
    let account = state.accounts.update_profile(&actor, fields).await?;
    uploads.commit(state.media.as_ref(), &account).await?;
    Ok(ApiResponse::success(account))
}
