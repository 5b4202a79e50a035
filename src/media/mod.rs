// Uploaded media
//
// Files are content-addressed: the stored name is the SHA-256 digest of the
// bytes plus the original extension, so re-uploading the same image yields
// the same URL.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::MediaConfig;

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// One uploaded file part
#[derive(Debug, Clone)]
pub struct Upload {
    /// Form field the file arrived under
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{field} must be one of: {}", ALLOWED_EXTENSIONS.join(", "))]
    UnsupportedType { field: String },

    #[error("{field} exceeds the {limit} byte upload limit")]
    TooLarge { field: String, limit: usize },

    #[error("{field} is empty")]
    Empty { field: String },

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Check an upload and return the public URL it will be stored under,
    /// without writing anything
    fn locate(&self, upload: &Upload) -> Result<String, MediaError>;

    /// Persist an upload and return its public URL
    async fn put(&self, upload: Upload) -> Result<String, MediaError>;
}

/// Stores uploads on the local filesystem under the configured directory
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    dir: PathBuf,
    public_url: String,
    max_bytes: usize,
}

impl LocalMediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            max_bytes: config.max_upload_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn extension(upload: &Upload) -> Result<String, MediaError> {
        Path::new(&upload.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| MediaError::UnsupportedType { field: upload.field.clone() })
    }

    /// Content digest file name for an upload
    pub fn stored_name(upload: &Upload) -> Result<String, MediaError> {
        let extension = Self::extension(upload)?;
        let digest = Sha256::digest(&upload.bytes);
        Ok(format!("{:x}.{}", digest, extension))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    fn locate(&self, upload: &Upload) -> Result<String, MediaError> {
        if upload.bytes.is_empty() {
            return Err(MediaError::Empty { field: upload.field.clone() });
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(MediaError::TooLarge { field: upload.field.clone(), limit: self.max_bytes });
        }

        let name = Self::stored_name(upload)?;
        Ok(format!("{}/{}", self.public_url, name))
    }

    async fn put(&self, upload: Upload) -> Result<String, MediaError> {
        let url = self.locate(&upload)?;
        let name = Self::stored_name(&upload)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), &upload.bytes).await?;

        tracing::info!("Stored upload {} ({} bytes)", name, upload.bytes.len());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path, max: usize) -> LocalMediaStore {
        LocalMediaStore::new(&MediaConfig {
            dir: dir.to_path_buf(),
            public_url: "http://localhost:5000/media/".to_string(),
            max_upload_bytes: max,
        })
    }

    fn upload(name: &str, bytes: &[u8]) -> Upload {
        Upload { field: "image".to_string(), file_name: name.to_string(), bytes: bytes.to_vec() }
    }

    #[tokio::test]
    async fn stores_by_content_digest() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(dir.path(), 1024);

        let url = media.put(upload("Photo.PNG", b"png-bytes")).await.unwrap();
        let again = media.put(upload("other.png", b"png-bytes")).await.unwrap();

        assert_eq!(url, again);
        assert!(url.starts_with("http://localhost:5000/media/"));
        assert!(url.ends_with(".png"));
        let name = url.rsplit('/').next().unwrap();
        assert_eq!(std::fs::read(dir.path().join(name)).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn locate_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(dir.path(), 1024);

        let located = media.locate(&upload("a.webp", b"webp-bytes")).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(media.put(upload("a.webp", b"webp-bytes")).await.unwrap(), located);
    }

    #[tokio::test]
    async fn rejects_disallowed_and_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(dir.path(), 4);

        assert!(matches!(media.put(upload("run.exe", b"abc")).await, Err(MediaError::UnsupportedType { .. })));
        assert!(matches!(media.put(upload("a.jpg", b"too-big")).await, Err(MediaError::TooLarge { .. })));
        assert!(matches!(media.put(upload("a.jpg", b"")).await, Err(MediaError::Empty { .. })));
    }
}
