use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{non_blank, FileRef};
use crate::auth::AuthUser;
use crate::entities::{applied_job, company, company_follower, job, resume, user_profile};
use crate::error::AppError;
use crate::storage::{self, file_key_from_url};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct AppliedJobEntry {
    #[serde(flatten)]
    pub application: applied_job::Model,
    pub job: Option<job::Model>,
}

/// Everything the profile page renders for the signed-in user.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: user_profile::Model,
    /// Newest first
    pub resumes: Vec<resume::Model>,
    /// Newest first; a user may apply to the same job more than once
    pub applied_jobs: Vec<AppliedJobEntry>,
    pub followed_companies: Vec<company::Model>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpsertProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    /// Must reference one of the caller's resumes
    pub active_resume_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddResumesRequest {
    #[serde(default)]
    pub resumes: Vec<FileRef>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyRequest {
    pub job_id: Option<Uuid>,
}

async fn find_profile<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> Result<user_profile::Model, AppError> {
    user_profile::Entity::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User profile".to_string()))
}

/// Creates an empty profile for `user_id` unless one exists.
async fn ensure_profile<C: ConnectionTrait>(db: &C, user_id: &str) -> Result<(), AppError> {
    let now = Utc::now();
    user_profile::Entity::insert(user_profile::ActiveModel {
        user_id: Set(user_id.to_string()),
        full_name: Set(None),
        email: Set(None),
        contact: Set(None),
        active_resume_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::column(user_profile::Column::UserId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;
    Ok(())
}

/// The caller's profile with resumes, applications and followed companies
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No profile yet")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = find_profile(&state.db, &user_id).await?;

    let resumes = resume::Entity::find()
        .filter(resume::Column::UserProfileId.eq(user_id.as_str()))
        .order_by_desc(resume::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let applied_jobs = applied_job::Entity::find()
        .filter(applied_job::Column::UserProfileId.eq(user_id.as_str()))
        .order_by_desc(applied_job::Column::AppliedAt)
        .find_also_related(job::Entity)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|(application, job)| AppliedJobEntry { application, job })
        .collect();

    let followed_ids: Vec<Uuid> = company_follower::Entity::find()
        .filter(company_follower::Column::UserId.eq(user_id.as_str()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|f| f.company_id)
        .collect();
    let followed_companies = company::Entity::find()
        .filter(company::Column::Id.is_in(followed_ids))
        .order_by_asc(company::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(ProfileResponse {
        profile,
        resumes,
        applied_jobs,
        followed_companies,
    }))
}

/// Create or update the caller's profile
#[utoipa::path(
    patch,
    path = "/users/me",
    request_body = UpsertProfileRequest,
    responses(
        (status = 200, description = "The stored profile", body = user_profile::Model),
        (status = 400, description = "Active resume does not belong to the caller"),
        (status = 401, description = "Not signed in")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn upsert_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpsertProfileRequest>,
) -> Result<Json<user_profile::Model>, AppError> {
    if let Some(resume_id) = payload.active_resume_id {
        resume::Entity::find_by_id(resume_id)
            .filter(resume::Column::UserProfileId.eq(user_id.as_str()))
            .one(&state.db)
            .await?
            .ok_or_else(|| {
                tracing::warn!(%resume_id, "active resume not owned by caller");
                AppError::InvalidRequest("Unknown resume".to_string())
            })?;
    }

    ensure_profile(&state.db, &user_id).await?;
    let mut active: user_profile::ActiveModel = find_profile(&state.db, &user_id).await?.into();
    if let Some(full_name) = payload.full_name {
        active.full_name = Set(Some(full_name));
    }
    if let Some(email) = payload.email {
        active.email = Set(Some(email));
    }
    if let Some(contact) = payload.contact {
        active.contact = Set(Some(contact));
    }
    if let Some(resume_id) = payload.active_resume_id {
        active.active_resume_id = Set(Some(resume_id));
    }
    active.updated_at = Set(Utc::now());

    Ok(Json(active.update(&state.db).await?))
}

/// Add uploaded resumes to the caller's profile
#[utoipa::path(
    post,
    path = "/users/me/resumes",
    request_body = AddResumesRequest,
    responses(
        (status = 200, description = "Resumes that were created; blank and known URLs are skipped", body = Vec<resume::Model>),
        (status = 400, description = "No resumes given"),
        (status = 401, description = "Not signed in")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn add_resumes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<AddResumesRequest>,
) -> Result<Json<Vec<resume::Model>>, AppError> {
    if payload.resumes.is_empty() {
        return Err(AppError::InvalidRequest("No resumes provided".to_string()));
    }
    ensure_profile(&state.db, &user_id).await?;

    let mut seen: HashSet<String> = resume::Entity::find()
        .filter(resume::Column::UserProfileId.eq(user_id.as_str()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|r| r.url)
        .collect();

    let now = Utc::now();
    let mut created = Vec::new();
    for file in payload.resumes {
        let url = file.url.trim().to_string();
        if url.is_empty() || !seen.insert(url.clone()) {
            continue;
        }
        let name = non_blank(Some(file.name))
            .or_else(|| file_key_from_url(&url))
            .unwrap_or_else(|| url.clone());
        created.push(resume::Model {
            id: Uuid::new_v4(),
            user_profile_id: user_id.clone(),
            name,
            url,
            created_at: now,
        });
    }

    if !created.is_empty() {
        resume::Entity::insert_many(created.iter().cloned().map(resume::ActiveModel::from))
            .exec_without_returning(&state.db)
            .await?;
        tracing::info!(count = created.len(), "Resumes added");
    }

    Ok(Json(created))
}

/// Delete one of the caller's resumes and its file
#[utoipa::path(
    delete,
    path = "/users/me/resumes/{resume_id}",
    params(("resume_id" = Uuid, Path, description = "Resume id")),
    responses(
        (status = 200, description = "The deleted resume", body = resume::Model),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Resume not found"),
        (status = 500, description = "File storage rejected the delete")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_resume(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<resume::Model>, AppError> {
    let resume = resume::Entity::find_by_id(resume_id)
        .filter(resume::Column::UserProfileId.eq(user_id.as_str()))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume".to_string()))?;

    storage::delete_urls(state.storage.as_ref(), std::slice::from_ref(&resume.url))
        .await
        .map_err(|e| {
            tracing::error!("[RESUME_DELETE]: {}", e);
            AppError::from(e)
        })?;

    let txn = state.db.begin().await?;
    user_profile::Entity::update_many()
        .col_expr(
            user_profile::Column::ActiveResumeId,
            Expr::value(Option::<Uuid>::None),
        )
        .filter(user_profile::Column::UserId.eq(user_id.as_str()))
        .filter(user_profile::Column::ActiveResumeId.eq(resume.id))
        .exec(&txn)
        .await?;
    resume::Entity::delete_by_id(resume.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(Json(resume))
}

/// Record an application to a job
#[utoipa::path(
    patch,
    path = "/users/me/applied-jobs",
    request_body = ApplyRequest,
    responses(
        (status = 200, description = "The recorded application", body = applied_job::Model),
        (status = 400, description = "Job id is missing"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Profile or job not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn apply_to_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ApplyRequest>,
) -> Result<Json<applied_job::Model>, AppError> {
    let job_id = payload
        .job_id
        .ok_or_else(|| AppError::InvalidRequest("Job id is missing".to_string()))?;

    let profile = find_profile(&state.db, &user_id).await?;
    let job = job::Entity::find_by_id(job_id)
        .filter(job::Column::IsPublished.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

    let application = applied_job::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_profile_id: Set(profile.user_id),
        job_id: Set(job.id),
        applied_at: Set(Utc::now()),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(job_id = %job.id, "Application recorded");
    Ok(Json(application))
}
