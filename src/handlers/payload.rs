use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::app::AppState;
use crate::database::{Record, ResourceSchema};
use crate::error::ApiError;
use crate::media::{MediaError, MediaStore, Upload};

/// File form fields and the record column their URL is written to
const FILE_FIELDS: &[(&str, &str)] = &[("image", "image_url"), ("avatar", "avatar_url")];

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    #[error("Request body exceeds the upload limit")]
    TooLarge,

    #[error("Unexpected file field '{0}'")]
    UnexpectedFile(String),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl PayloadError {
    fn rejected(status: StatusCode, text: String, wrap: fn(String) -> PayloadError) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            PayloadError::TooLarge
        } else {
            wrap(text)
        }
    }
}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::TooLarge => ApiError::payload_too_large("Request body exceeds the upload limit"),
            PayloadError::Media(MediaError::Io(e)) => {
                tracing::error!("Failed to store upload: {}", e);
                ApiError::internal_server_error("Failed to store upload")
            }
            other => ApiError::invalid_input(other.to_string()),
        }
    }
}

/// A checked file part waiting to be written
#[derive(Debug)]
struct StagedUpload {
    column: &'static str,
    url: String,
    upload: Upload,
}

/// Files from a multipart body. Nothing is written to the media store until
/// `commit`, so rejected requests leave no files behind.
#[derive(Debug, Default)]
pub struct StagedUploads(Vec<StagedUpload>);

impl StagedUploads {
    /// Reject files sent for a column the resource does not have
    pub fn check(&self, schema: &ResourceSchema) -> Result<(), PayloadError> {
        match self.0.iter().find(|staged| schema.field(staged.column).is_none()) {
            Some(staged) => Err(PayloadError::UnexpectedFile(staged.upload.field.clone())),
            None => Ok(()),
        }
    }

    /// Write the files the stored record actually references
    pub async fn commit(self, media: &dyn MediaStore, record: &Record) -> Result<(), PayloadError> {
        for staged in self.0 {
            if record.get(staged.column).and_then(Value::as_str) != Some(staged.url.as_str()) {
                tracing::debug!("Discarding unreferenced upload for {}", staged.column);
                continue;
            }
            media.put(staged.upload).await?;
        }
        Ok(())
    }
}

/// Request body as a JSON object, from either `application/json` or
/// `multipart/form-data`.
///
/// Multipart file parts are checked against the media store and replaced by
/// the URL they will be stored under; an uploaded file wins over a URL sent
/// in the same body. Empty text parts count as absent.
#[derive(Debug)]
pub struct Payload {
    pub body: Value,
    pub uploads: StagedUploads,
}

#[async_trait]
impl FromRequest<AppState> for Payload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Json(body) = Json::<Value>::from_request(req, state).await.map_err(|rejection| {
                PayloadError::rejected(rejection.status(), rejection.body_text(), PayloadError::InvalidJson)
            })?;
            return Ok(Payload { body, uploads: StagedUploads::default() });
        }

        let mut multipart = Multipart::from_request(req, state).await.map_err(|rejection| {
            PayloadError::rejected(rejection.status(), rejection.body_text(), PayloadError::Multipart)
        })?;
        let part_error = |e: axum::extract::multipart::MultipartError| {
            PayloadError::rejected(e.status(), e.body_text(), PayloadError::Multipart)
        };

        let mut body = Map::new();
        let mut staged = Vec::new();

        while let Some(field) = multipart.next_field().await.map_err(part_error)? {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);

            match file_name {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(part_error)?;
                    // browsers send an empty part when no file was picked
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    let column = FILE_FIELDS
                        .iter()
                        .find(|(field, _)| *field == name)
                        .map(|(_, column)| *column)
                        .ok_or_else(|| PayloadError::UnexpectedFile(name.clone()))?;

                    let upload = Upload { field: name, file_name, bytes: bytes.to_vec() };
                    let url = state.media.locate(&upload).map_err(PayloadError::from)?;
                    staged.push(StagedUpload { column, url, upload });
                }
                None => {
                    let text = field.text().await.map_err(part_error)?;
                    if !text.is_empty() {
                        body.insert(name, Value::String(text));
                    }
                }
            }
        }

        for upload in &staged {
            body.insert(upload.column.to_string(), Value::String(upload.url.clone()));
        }

        Ok(Payload { body: Value::Object(body), uploads: StagedUploads(staged) })
    }
}
