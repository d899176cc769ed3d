use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{discard_files, find_owned_job, non_blank, replaced_file, MessageResponse};
use crate::auth::{AuthUser, Caller};
use crate::entities::{applied_job, attachment, category, company, job, resume, saved_job, user_profile};
use crate::error::AppError;
use crate::search::{self, JobFilter, JobSearchParams, JobWithRelations};
use crate::storage;
use crate::AppState;

pub const SHIFT_TIMINGS: [&str; 3] = ["full-time", "part-time", "contract"];
pub const WORK_MODES: [&str; 3] = ["remote", "hybrid", "office"];
pub const EXPERIENCE_LEVELS: [&str; 4] = ["0", "2", "3", "5"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateJobRequest {
    /// Title of the new posting
    pub title: Option<String>,
}

/// Fields a poster can change; absent fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    /// `null` removes the image; a replaced or removed image is deleted from storage
    #[serde(default, deserialize_with = "super::nullable")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub hourly_rate: Option<String>,
    /// One of `full-time`, `part-time`, `contract`
    pub shift_timing: Option<String>,
    /// One of `remote`, `hybrid`, `office`
    pub work_mode: Option<String>,
    /// One of `0`, `2`, `3`, `5`
    pub years_of_experience: Option<String>,
    pub category_id: Option<Uuid>,
    /// Must be a company owned by the caller
    pub company_id: Option<Uuid>,
}

impl UpdateJobRequest {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.short_description.is_none()
            && self.image_url.is_none()
            && self.tags.is_none()
            && self.hourly_rate.is_none()
            && self.shift_timing.is_none()
            && self.work_mode.is_none()
            && self.years_of_experience.is_none()
            && self.category_id.is_none()
            && self.company_id.is_none()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobDetailResponse {
    pub job: JobWithRelations,
    /// Other published jobs in the same category, newest first
    pub related_jobs: Vec<JobWithRelations>,
}

/// A user who applied to a job, as shown to the poster.
#[derive(Debug, Serialize, ToSchema)]
pub struct Applicant {
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    /// First time this user applied to the job
    pub applied_at: DateTime<Utc>,
    pub active_resume: Option<resume::Model>,
}

fn check_vocabulary(field: &str, value: &str, allowed: &[&str]) -> Result<(), AppError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        tracing::warn!(field, value, "rejected value outside vocabulary");
        Err(AppError::InvalidRequest(format!(
            "{} must be one of {}",
            field,
            allowed.join(", ")
        )))
    }
}

async fn load_job(state: &AppState, job_id: Uuid) -> Result<JobWithRelations, AppError> {
    let job = job::Entity::find_by_id(job_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job".to_string()))?;
    search::with_relations(&state.db, vec![job])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Job".to_string()))
}

async fn set_published(
    state: &AppState,
    job_id: Uuid,
    user_id: &str,
    published: bool,
) -> Result<job::Model, AppError> {
    let job = find_owned_job(&state.db, job_id, user_id).await?;
    let mut active: job::ActiveModel = job.into();
    active.is_published = Set(published);
    active.updated_at = Set(Utc::now());
    Ok(active.update(&state.db).await?)
}

/// Search published jobs
#[utoipa::path(
    get,
    path = "/jobs",
    params(JobSearchParams),
    responses(
        (status = 200, description = "Matching published jobs, newest first", body = Vec<JobWithRelations>),
        (status = 400, description = "Malformed query parameter or category id")
    ),
    description = "Filters by title substring, category, posting date bucket and the shift timing, work mode and experience facets. `savedJobs=true` restricts to jobs saved by the caller; anonymous callers get an empty list."
)]
#[tracing::instrument(skip(state))]
pub async fn search_jobs(
    State(state): State<AppState>,
    caller: Caller,
    params: Result<Query<JobSearchParams>, QueryRejection>,
) -> Result<Json<Vec<JobWithRelations>>, AppError> {
    let Query(params) = params?;
    let filter = JobFilter::try_from(params)?;
    Ok(Json(search::get_jobs(&state.db, &filter, caller.user_id()).await))
}

/// Jobs posted by the caller, published or not
#[utoipa::path(
    get,
    path = "/jobs/mine",
    responses(
        (status = 200, description = "The caller's jobs, newest first", body = Vec<JobWithRelations>),
        (status = 401, description = "Not signed in")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_my_jobs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<JobWithRelations>>, AppError> {
    let jobs = job::Entity::find()
        .filter(job::Column::UserId.eq(user_id))
        .order_by_desc(job::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(search::with_relations(&state.db, jobs).await?))
}

/// Create a draft job
#[utoipa::path(
    post,
    path = "/jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 200, description = "Job created unpublished", body = job::Model),
        (status = 400, description = "Title is missing"),
        (status = 401, description = "Not signed in")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn create_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateJobRequest>,
) -> Result<Json<job::Model>, AppError> {
    let title = non_blank(payload.title)
        .ok_or_else(|| AppError::InvalidRequest("Title is missing".to_string()))?;

    let now = Utc::now();
    let created = job::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        title: Set(title),
        description: Set(String::new()),
        short_description: Set(String::new()),
        image_url: Set(None),
        is_published: Set(false),
        tags: Set(json!([])),
        hourly_rate: Set(None),
        shift_timing: Set(None),
        work_mode: Set(None),
        years_of_experience: Set(None),
        category_id: Set(None),
        company_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(job_id = %created.id, "Job created");
    Ok(Json(created))
}

/// Get one job with its relations and related jobs
#[utoipa::path(
    get,
    path = "/jobs/{job_id}",
    params(("job_id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "The job", body = JobDetailResponse),
        (status = 404, description = "Job not found")
    ),
    description = "Unpublished jobs are only visible to their poster."
)]
#[tracing::instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    caller: Caller,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobDetailResponse>, AppError> {
    let job = load_job(&state, job_id).await?;
    if !job.job.is_published && caller.user_id() != Some(job.job.user_id.as_str()) {
        return Err(AppError::NotFound("Job".to_string()));
    }

    let related = match job.job.category_id {
        Some(category_id) => {
            job::Entity::find()
                .filter(job::Column::IsPublished.eq(true))
                .filter(job::Column::CategoryId.eq(category_id))
                .filter(job::Column::Id.ne(job.job.id))
                .order_by_desc(job::Column::CreatedAt)
                .all(&state.db)
                .await?
        }
        None => Vec::new(),
    };

    Ok(Json(JobDetailResponse {
        job,
        related_jobs: search::with_relations(&state.db, related).await?,
    }))
}

/// Update a job owned by the caller
#[utoipa::path(
    patch,
    path = "/jobs/{job_id}",
    params(("job_id" = Uuid, Path, description = "Job id")),
    request_body = UpdateJobRequest,
    responses(
        (status = 200, description = "Updated job", body = job::Model),
        (status = 400, description = "Empty or invalid update"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn update_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
    Json(payload): Json<UpdateJobRequest>,
) -> Result<Json<job::Model>, AppError> {
    let existing = find_owned_job(&state.db, job_id, &user_id).await?;
    if payload.is_empty() {
        return Err(AppError::InvalidRequest("No data provided for update".to_string()));
    }

    if let Some(value) = &payload.shift_timing {
        check_vocabulary("shift_timing", value, &SHIFT_TIMINGS)?;
    }
    if let Some(value) = &payload.work_mode {
        check_vocabulary("work_mode", value, &WORK_MODES)?;
    }
    if let Some(value) = &payload.years_of_experience {
        check_vocabulary("years_of_experience", value, &EXPERIENCE_LEVELS)?;
    }
    if let Some(category_id) = payload.category_id {
        category::Entity::find_by_id(category_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::InvalidRequest("Unknown category".to_string()))?;
    }
    if let Some(company_id) = payload.company_id {
        company::Entity::find_by_id(company_id)
            .filter(company::Column::UserId.eq(user_id.as_str()))
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::InvalidRequest("Unknown company".to_string()))?;
    }

    let stale_image = payload
        .image_url
        .as_ref()
        .and_then(|next| replaced_file(existing.image_url.as_deref(), next.as_deref()));

    let mut active: job::ActiveModel = existing.into();
    if let Some(title) = payload.title {
        let title = non_blank(Some(title))
            .ok_or_else(|| AppError::InvalidRequest("Title is missing".to_string()))?;
        active.title = Set(title);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(short_description) = payload.short_description {
        active.short_description = Set(short_description);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(non_blank(image_url));
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(json!(tags));
    }
    if let Some(hourly_rate) = payload.hourly_rate {
        active.hourly_rate = Set(Some(hourly_rate));
    }
    if let Some(shift_timing) = payload.shift_timing {
        active.shift_timing = Set(Some(shift_timing));
    }
    if let Some(work_mode) = payload.work_mode {
        active.work_mode = Set(Some(work_mode));
    }
    if let Some(years) = payload.years_of_experience {
        active.years_of_experience = Set(Some(years));
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(Some(category_id));
    }
    if let Some(company_id) = payload.company_id {
        active.company_id = Set(Some(company_id));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    discard_files(state.storage.as_ref(), stale_image.into_iter().collect(), "JOB_PATCH").await;
    Ok(Json(updated))
}

/// Delete a job and its files
#[utoipa::path(
    delete,
    path = "/jobs/{job_id}",
    params(("job_id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "The deleted job", body = job::Model),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Job not found"),
        (status = 500, description = "File storage rejected the delete; nothing was removed")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<job::Model>, AppError> {
    let job = find_owned_job(&state.db, job_id, &user_id).await?;
    let attachments = attachment::Entity::find()
        .filter(attachment::Column::JobId.eq(job.id))
        .all(&state.db)
        .await?;

    let mut urls: Vec<String> = job.image_url.iter().cloned().collect();
    urls.extend(attachments.into_iter().map(|a| a.url));

    // Files go first so a storage failure leaves the rows intact
    storage::delete_urls(state.storage.as_ref(), &urls)
        .await
        .map_err(|e| {
            tracing::error!("[JOB_DELETE]: {}", e);
            AppError::from(e)
        })?;

    let txn = state.db.begin().await?;
    attachment::Entity::delete_many()
        .filter(attachment::Column::JobId.eq(job.id))
        .exec(&txn)
        .await?;
    job::Entity::delete_by_id(job.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(job_id = %job.id, "Job deleted");
    Ok(Json(job))
}

/// Publish a job
#[utoipa::path(
    patch,
    path = "/jobs/{job_id}/publish",
    params(("job_id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Published job", body = job::Model),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn publish_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<job::Model>, AppError> {
    Ok(Json(set_published(&state, job_id, &user_id, true).await?))
}

/// Unpublish a job
#[utoipa::path(
    patch,
    path = "/jobs/{job_id}/unpublish",
    params(("job_id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Unpublished job", body = job::Model),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn unpublish_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<job::Model>, AppError> {
    Ok(Json(set_published(&state, job_id, &user_id, false).await?))
}

/// Save a job for later
#[utoipa::path(
    patch,
    path = "/jobs/{job_id}/save",
    params(("job_id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "The job with its saved users, or a message when it was already saved", body = JobWithRelations),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn save_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    job::Entity::find_by_id(job_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

    let inserted = saved_job::Entity::insert(saved_job::ActiveModel {
        job_id: Set(job_id),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
    })
    .on_conflict(
        OnConflict::columns([saved_job::Column::JobId, saved_job::Column::UserId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.db)
    .await?;

    if inserted == 0 {
        tracing::info!("Job already saved");
        return Ok(Json(MessageResponse::new("Job already saved")).into_response());
    }

    Ok(Json(load_job(&state, job_id).await?).into_response())
}

/// Remove a job from the caller's saved list
#[utoipa::path(
    patch,
    path = "/jobs/{job_id}/unsave",
    params(("job_id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "The job with its saved users", body = JobWithRelations),
        (status = 400, description = "Job was not saved"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn unsave_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobWithRelations>, AppError> {
    job::Entity::find_by_id(job_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

    let removed = saved_job::Entity::delete_many()
        .filter(saved_job::Column::JobId.eq(job_id))
        .filter(saved_job::Column::UserId.eq(user_id))
        .exec(&state.db)
        .await?;

    if removed.rows_affected == 0 {
        return Err(AppError::InvalidRequest("Job is not saved".to_string()));
    }

    Ok(Json(load_job(&state, job_id).await?))
}

/// List the applicants of a job
#[utoipa::path(
    get,
    path = "/jobs/{job_id}/applicants",
    params(("job_id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Applicants, most recent first", body = Vec<Applicant>),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_applicants(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Vec<Applicant>>, AppError> {
    find_owned_job(&state.db, job_id, &user_id).await?;

    let applications = applied_job::Entity::find()
        .filter(applied_job::Column::JobId.eq(job_id))
        .order_by_asc(applied_job::Column::AppliedAt)
        .all(&state.db)
        .await?;

    let mut first_applied: HashMap<String, DateTime<Utc>> = HashMap::new();
    for application in applications {
        first_applied
            .entry(application.user_profile_id)
            .or_insert(application.applied_at);
    }
    if first_applied.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let profiles = user_profile::Entity::find()
        .filter(user_profile::Column::UserId.is_in(first_applied.keys().cloned()))
        .all(&state.db)
        .await?;

    let resume_ids: Vec<Uuid> = profiles.iter().filter_map(|p| p.active_resume_id).collect();
    let mut resumes: HashMap<Uuid, resume::Model> = resume::Entity::find()
        .filter(resume::Column::Id.is_in(resume_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    let mut applicants: Vec<Applicant> = profiles
        .into_iter()
        .filter_map(|profile| {
            let applied_at = *first_applied.get(&profile.user_id)?;
            let active_resume = profile.active_resume_id.and_then(|id| resumes.remove(&id));
            Some(Applicant {
                user_id: profile.user_id,
                full_name: profile.full_name,
                email: profile.email,
                contact: profile.contact,
                applied_at,
                active_resume,
            })
        })
        .collect();
    applicants.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));

    Ok(Json(applicants))
}
