//! Client for the file-hosting provider that stores job images, attachments
//! and resumes. The backend only ever deletes: uploads go from the browser
//! straight to the provider, which hands back a URL whose last path segment
//! is the file key.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde_json::json;
use std::fmt;
use url::Url;

use crate::config::StorageSettings;

#[derive(Debug)]
pub enum StorageError {
    Request(String),
    Rejected { status: u16, body: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Request(msg) => write!(f, "request to storage provider failed: {}", msg),
            StorageError::Rejected { status, body } => {
                write!(f, "storage provider rejected delete ({}): {}", status, body)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Request(err.to_string())
    }
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn delete_files(&self, keys: &[String]) -> Result<(), StorageError>;
}

/// UploadThing-compatible delete API.
pub struct UploadThingStorage {
    client: Client,
    api_url: String,
    api_key: String,
}

impl UploadThingStorage {
    pub fn new(settings: &StorageSettings) -> Self {
        Self {
            client: Client::new(),
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
        }
    }
}

#[async_trait]
impl FileStorage for UploadThingStorage {
    #[tracing::instrument(skip(self), fields(count = keys.len()))]
    async fn delete_files(&self, keys: &[String]) -> Result<(), StorageError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("X-Uploadthing-Api-Key", &self.api_key)
            .json(&json!({ "fileKeys": keys }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(StorageError::Rejected { status, body });
        }

        tracing::info!("Deleted {} file(s) from storage", keys.len());
        Ok(())
    }
}

/// Used when no provider credentials are configured; deletes become no-ops.
pub struct DisabledStorage;

#[async_trait]
impl FileStorage for DisabledStorage {
    async fn delete_files(&self, keys: &[String]) -> Result<(), StorageError> {
        tracing::warn!(?keys, "file storage not configured; skipping delete");
        Ok(())
    }
}

/// The provider key is the last non-empty path segment of the file URL.
pub fn file_key_from_url(file_url: &str) -> Option<String> {
    let last = match Url::parse(file_url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        Err(_) => file_url.rsplit('/').find(|s| !s.is_empty()).map(str::to_string),
    };
    last.filter(|key| !key.is_empty())
}

/// Deletes the files behind `urls` one request per file, concurrently.
/// Every request is awaited; the first failure is returned.
pub async fn delete_urls(storage: &dyn FileStorage, urls: &[String]) -> Result<(), StorageError> {
    let deletions = urls
        .iter()
        .filter_map(|url| file_key_from_url(url))
        .map(|key| async move { storage.delete_files(&[key]).await });

    join_all(deletions)
        .await
        .into_iter()
        .collect::<Result<Vec<()>, StorageError>>()
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_last_path_segment() {
        assert_eq!(
            file_key_from_url("https://utfs.io/f/abc123-logo.png"),
            Some("abc123-logo.png".to_string())
        );
        assert_eq!(
            file_key_from_url("https://utfs.io/f/abc123/"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn key_from_relative_path() {
        assert_eq!(file_key_from_url("uploads/resume.pdf"), Some("resume.pdf".to_string()));
        assert_eq!(file_key_from_url(""), None);
        assert_eq!(file_key_from_url("https://utfs.io/"), None);
    }
}
