use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{discard_files, non_blank, replaced_file};
use crate::auth::AuthUser;
use crate::entities::{company, company_follower, job};
use crate::error::AppError;
use crate::search::{self, JobWithRelations};
use crate::AppState;

/// Optional profile fields shared by create and update.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CompanyDetails {
    pub description: Option<String>,
    /// `null` removes the logo; a replaced or removed logo is deleted from storage
    #[serde(default, deserialize_with = "super::nullable")]
    #[schema(value_type = Option<String>)]
    pub logo: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    #[schema(value_type = Option<String>)]
    pub cover_image: Option<Option<String>>,
    pub mail: Option<String>,
    pub website: Option<String>,
    pub linked_in: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub overview: Option<String>,
    pub why_join_us: Option<String>,
}

impl CompanyDetails {
    fn is_empty(&self) -> bool {
        [
            &self.description,
            &self.mail,
            &self.website,
            &self.linked_in,
            &self.address_line_1,
            &self.address_line_2,
            &self.city,
            &self.state,
            &self.zipcode,
            &self.overview,
            &self.why_join_us,
        ]
        .iter()
        .all(|field| field.is_none())
            && self.logo.is_none()
            && self.cover_image.is_none()
    }

    /// Stored images this update replaces or clears.
    fn stale_files(&self, existing: &company::Model) -> Vec<String> {
        [(&self.logo, &existing.logo), (&self.cover_image, &existing.cover_image)]
            .into_iter()
            .filter_map(|(next, previous)| {
                next.as_ref()
                    .and_then(|next| replaced_file(Some(previous.as_str()), next.as_deref()))
            })
            .collect()
    }

    fn apply(self, active: &mut company::ActiveModel) {
        for (image, slot) in [(self.logo, &mut active.logo), (self.cover_image, &mut active.cover_image)] {
            if let Some(image) = image {
                *slot = Set(non_blank(image).unwrap_or_default());
            }
        }
        let fields = [
            (self.description, &mut active.description),
            (self.mail, &mut active.mail),
            (self.website, &mut active.website),
            (self.linked_in, &mut active.linked_in),
            (self.address_line_1, &mut active.address_line_1),
            (self.address_line_2, &mut active.address_line_2),
            (self.city, &mut active.city),
            (self.state, &mut active.state),
            (self.zipcode, &mut active.zipcode),
            (self.overview, &mut active.overview),
            (self.why_join_us, &mut active.why_join_us),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = Set(value);
            }
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    pub name: Option<String>,
    #[serde(flatten)]
    pub details: CompanyDetails,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    #[serde(flatten)]
    pub details: CompanyDetails,
}

/// A company page: the profile, who follows it and its open positions.
#[derive(Debug, Serialize, ToSchema)]
pub struct CompanyDetailResponse {
    #[serde(flatten)]
    pub company: company::Model,
    /// User ids following the company
    pub followers: Vec<String>,
    /// Published jobs, newest first
    pub jobs: Vec<JobWithRelations>,
}

async fn load_company(state: &AppState, company_id: Uuid) -> Result<company::Model, AppError> {
    company::Entity::find_by_id(company_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company".to_string()))
}

async fn company_detail(
    state: &AppState,
    company: company::Model,
) -> Result<CompanyDetailResponse, AppError> {
    let followers = company_follower::Entity::find()
        .filter(company_follower::Column::CompanyId.eq(company.id))
        .order_by_asc(company_follower::Column::CreatedAt)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|f| f.user_id)
        .collect();

    let jobs = job::Entity::find()
        .filter(job::Column::CompanyId.eq(company.id))
        .filter(job::Column::IsPublished.eq(true))
        .order_by_desc(job::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(CompanyDetailResponse {
        company,
        followers,
        jobs: search::with_relations(&state.db, jobs).await?,
    })
}

/// List all companies
#[utoipa::path(
    get,
    path = "/companies",
    responses(
        (status = 200, description = "All companies, newest first", body = Vec<company::Model>)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_companies(
    State(state): State<AppState>,
) -> Result<Json<Vec<company::Model>>, AppError> {
    let companies = company::Entity::find()
        .order_by_desc(company::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(companies))
}

/// Companies owned by the caller
#[utoipa::path(
    get,
    path = "/companies/mine",
    responses(
        (status = 200, description = "The caller's companies, newest first", body = Vec<company::Model>),
        (status = 401, description = "Not signed in")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_my_companies(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<company::Model>>, AppError> {
    let companies = company::Entity::find()
        .filter(company::Column::UserId.eq(user_id))
        .order_by_desc(company::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(companies))
}

/// Create a company
#[utoipa::path(
    post,
    path = "/companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 200, description = "Company created", body = company::Model),
        (status = 400, description = "Name is missing"),
        (status = 401, description = "Not signed in")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn create_company(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateCompanyRequest>,
) -> Result<Json<company::Model>, AppError> {
    let name = non_blank(payload.name)
        .ok_or_else(|| AppError::InvalidRequest("Name is missing".to_string()))?;

    let now = Utc::now();
    let mut active = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        name: Set(name),
        description: Set(String::new()),
        logo: Set(String::new()),
        cover_image: Set(String::new()),
        mail: Set(String::new()),
        website: Set(String::new()),
        linked_in: Set(String::new()),
        address_line_1: Set(String::new()),
        address_line_2: Set(String::new()),
        city: Set(String::new()),
        state: Set(String::new()),
        zipcode: Set(String::new()),
        overview: Set(String::new()),
        why_join_us: Set(String::new()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    payload.details.apply(&mut active);

    let created = active.insert(&state.db).await?;
    tracing::info!(company_id = %created.id, "Company created");
    Ok(Json(created))
}

/// Get a company with its followers and published jobs
#[utoipa::path(
    get,
    path = "/companies/{company_id}",
    params(("company_id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "The company", body = CompanyDetailResponse),
        (status = 404, description = "Company not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CompanyDetailResponse>, AppError> {
    let company = load_company(&state, company_id).await?;
    Ok(Json(company_detail(&state, company).await?))
}

/// Update a company owned by the caller
#[utoipa::path(
    patch,
    path = "/companies/{company_id}",
    params(("company_id" = Uuid, Path, description = "Company id")),
    request_body = UpdateCompanyRequest,
    responses(
        (status = 200, description = "Updated company", body = company::Model),
        (status = 400, description = "No data provided for update"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Company not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn update_company(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(company_id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyRequest>,
) -> Result<Json<company::Model>, AppError> {
    let existing = company::Entity::find_by_id(company_id)
        .filter(company::Column::UserId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company".to_string()))?;

    if payload.name.is_none() && payload.details.is_empty() {
        return Err(AppError::InvalidRequest("No data provided for update".to_string()));
    }

    let stale = payload.details.stale_files(&existing);
    let mut active: company::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        let name = non_blank(Some(name))
            .ok_or_else(|| AppError::InvalidRequest("Name is missing".to_string()))?;
        active.name = Set(name);
    }
    payload.details.apply(&mut active);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    discard_files(state.storage.as_ref(), stale, "COMPANY_PATCH").await;
    Ok(Json(updated))
}

/// Follow a company
#[utoipa::path(
    patch,
    path = "/companies/{company_id}/follow",
    params(("company_id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "The company with its followers", body = CompanyDetailResponse),
        (status = 400, description = "Already following"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Company not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn follow_company(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CompanyDetailResponse>, AppError> {
    let company = load_company(&state, company_id).await?;

    let inserted = company_follower::Entity::insert(company_follower::ActiveModel {
        company_id: Set(company.id),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
    })
    .on_conflict(
        OnConflict::columns([
            company_follower::Column::CompanyId,
            company_follower::Column::UserId,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(&state.db)
    .await?;

    if inserted == 0 {
        return Err(AppError::InvalidRequest("Already following this company".to_string()));
    }

    Ok(Json(company_detail(&state, company).await?))
}

/// Stop following a company
#[utoipa::path(
    patch,
    path = "/companies/{company_id}/unfollow",
    params(("company_id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "The company with its followers", body = CompanyDetailResponse),
        (status = 400, description = "Not following"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Company not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn unfollow_company(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CompanyDetailResponse>, AppError> {
    let company = load_company(&state, company_id).await?;

    let removed = company_follower::Entity::delete_many()
        .filter(company_follower::Column::CompanyId.eq(company.id))
        .filter(company_follower::Column::UserId.eq(user_id))
        .exec(&state.db)
        .await?;

    if removed.rows_affected == 0 {
        return Err(AppError::InvalidRequest("Not following this company".to_string()));
    }

    Ok(Json(company_detail(&state, company).await?))
}
