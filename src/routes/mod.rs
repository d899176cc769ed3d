// Export all route modules
pub mod ai;
pub mod analytics;
pub mod attachments;
pub mod categories;
pub mod companies;
pub mod jobs;
pub mod notifications;
pub mod users;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::job;
use crate::error::AppError;
use crate::storage::{self, FileStorage};

/// Plain acknowledgement body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A file reference supplied by the client after uploading it to storage.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FileRef {
    pub url: String,
    #[serde(default)]
    pub name: String,
}

/// Loads a job only when `user_id` owns it; anything else is a 404.
pub(crate) async fn find_owned_job<C: ConnectionTrait>(
    db: &C,
    job_id: Uuid,
    user_id: &str,
) -> Result<job::Model, AppError> {
    job::Entity::find_by_id(job_id)
        .filter(job::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job".to_string()))
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// For update fields where `null` clears the value: an absent field is
/// `None`, an explicit `null` is `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// The stored file URL an update drops, if `next` replaces or clears it.
pub(crate) fn replaced_file(previous: Option<&str>, next: Option<&str>) -> Option<String> {
    let previous = previous.map(str::trim).filter(|p| !p.is_empty())?;
    let next = next.map(str::trim).filter(|n| !n.is_empty());
    (next != Some(previous)).then(|| previous.to_string())
}

/// Deletes files an already-saved update no longer references. A failure
/// only orphans the file, so it is logged and not returned.
pub(crate) async fn discard_files(storage: &dyn FileStorage, urls: Vec<String>, context: &str) {
    if urls.is_empty() {
        return;
    }
    if let Err(e) = storage::delete_urls(storage, &urls).await {
        tracing::error!("[{}]: {}", context, e);
    }
}
