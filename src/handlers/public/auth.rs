use axum::extract::State;

use crate::app::AppState;
use crate::database::models::ACCOUNTS;
use crate::database::{FieldSet, Record};
use crate::handlers::Payload;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::LoginResponse;

/// POST /api/auth/register - Self sign-up, always as a standard user
pub async fn register(State(state): State<AppState>, Payload { body, uploads }: Payload) -> ApiResult<Record> {
    uploads.check(&ACCOUNTS)?;
    let fields = FieldSet::from_json(&ACCOUNTS, body)?;
    let account = state.accounts.register(fields).await?;
    uploads.commit(state.media.as_ref(), &account).await?;
    Ok(ApiResponse::created(account))
}

/// POST /api/auth/login - Exchange email and password for a bearer token
pub async fn login(State(state): State<AppState>, Payload { body, .. }: Payload) -> ApiResult<LoginResponse> {
    let session = state.accounts.login(&body).await?;
    Ok(ApiResponse::success(session))
}
