use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, ModelTrait, QueryFilter};
use serde::Deserialize;
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{find_owned_job, FileRef};
use crate::auth::AuthUser;
use crate::entities::attachment;
use crate::error::AppError;
use crate::storage::{self, file_key_from_url};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddAttachmentsRequest {
    #[serde(default)]
    pub attachments: Vec<FileRef>,
}

/// Attach uploaded files to a job
#[utoipa::path(
    post,
    path = "/jobs/{job_id}/attachments",
    params(("job_id" = Uuid, Path, description = "Job id")),
    request_body = AddAttachmentsRequest,
    responses(
        (status = 200, description = "Attachments that were created; URLs already attached are skipped", body = Vec<attachment::Model>),
        (status = 400, description = "No attachments given"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn add_attachments(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
    Json(payload): Json<AddAttachmentsRequest>,
) -> Result<Json<Vec<attachment::Model>>, AppError> {
    let job = find_owned_job(&state.db, job_id, &user_id).await?;
    if payload.attachments.is_empty() {
        return Err(AppError::InvalidRequest("No attachments provided".to_string()));
    }

    let mut seen: HashSet<String> = job
        .find_related(attachment::Entity)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|a| a.url)
        .collect();

    let now = Utc::now();
    let mut created = Vec::new();
    for file in payload.attachments {
        let url = file.url.trim().to_string();
        if url.is_empty() || !seen.insert(url.clone()) {
            continue;
        }
        let name = match file.name.trim() {
            "" => file_key_from_url(&url).unwrap_or_else(|| url.clone()),
            name => name.to_string(),
        };
        created.push(attachment::Model {
            id: Uuid::new_v4(),
            job_id: job.id,
            name,
            url,
            created_at: now,
        });
    }

    if created.is_empty() {
        tracing::info!("All attachments already present");
        return Ok(Json(created));
    }

    attachment::Entity::insert_many(created.iter().cloned().map(attachment::ActiveModel::from))
        .exec_without_returning(&state.db)
        .await?;

    tracing::info!(count = created.len(), "Attachments added");
    Ok(Json(created))
}

/// Remove an attachment and its file
#[utoipa::path(
    delete,
    path = "/jobs/{job_id}/attachments/{attachment_id}",
    params(
        ("job_id" = Uuid, Path, description = "Job id"),
        ("attachment_id" = Uuid, Path, description = "Attachment id")
    ),
    responses(
        (status = 200, description = "The deleted attachment", body = attachment::Model),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Job or attachment not found"),
        (status = 500, description = "File storage rejected the delete")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_attachment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((job_id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<attachment::Model>, AppError> {
    let job = find_owned_job(&state.db, job_id, &user_id).await?;
    let attachment = attachment::Entity::find_by_id(attachment_id)
        .filter(attachment::Column::JobId.eq(job.id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Attachment".to_string()))?;

    storage::delete_urls(state.storage.as_ref(), std::slice::from_ref(&attachment.url))
        .await
        .map_err(|e| {
            tracing::error!("[ATTACHMENT_DELETE]: {}", e);
            AppError::from(e)
        })?;

    attachment::Entity::delete_by_id(attachment.id)
        .exec(&state.db)
        .await?;

    Ok(Json(attachment))
}
