use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::SmartIpKeyExtractor,
    GovernorLayer,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod ai;
pub mod analytics;
pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod mail;
pub mod routes;
pub mod search;
pub mod seed;
pub mod storage;

use crate::ai::{DisabledGenerator, GeminiGenerator, TextGenerator};
use crate::auth::AuthKeys;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::mail::{MailSender, SmtpMailer, UnconfiguredMailer};
use crate::storage::{DisabledStorage, FileStorage, UploadThingStorage};

/// Shared handles every handler receives. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthKeys>,
    pub storage: Arc<dyn FileStorage>,
    pub mailer: Arc<dyn MailSender>,
    pub generator: Arc<dyn TextGenerator>,
}

impl AppState {
    /// Wires the external clients described by `config` around `db`.
    pub fn from_config(db: DatabaseConnection, config: &AppConfig) -> Result<Self, AppError> {
        let storage: Arc<dyn FileStorage> = match &config.storage {
            Some(settings) => Arc::new(UploadThingStorage::new(settings)),
            None => {
                tracing::warn!("UPLOADTHING_SECRET not set; file deletes will be skipped");
                Arc::new(DisabledStorage)
            }
        };

        let mailer: Arc<dyn MailSender> = match &config.smtp {
            Some(settings) => Arc::new(SmtpMailer::new(settings)?),
            None => {
                tracing::warn!("SMTP credentials not set; mail endpoints will fail");
                Arc::new(UnconfiguredMailer)
            }
        };

        let generator: Arc<dyn TextGenerator> = match &config.ai {
            Some(settings) => Arc::new(GeminiGenerator::new(settings)),
            None => {
                tracing::warn!("GEMINI_API_KEY not set; text generation will fail");
                Arc::new(DisabledGenerator)
            }
        };

        Ok(Self {
            db,
            auth: Arc::new(AuthKeys::new(&config.auth)),
            storage,
            mailer,
            generator,
        })
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "JOB PORTAL API",
        version = "0.1.0",
        description = "Job postings, company profiles, search, saved jobs and applications"
    ),
    paths(
        health_check,
        routes::jobs::search_jobs,
        routes::jobs::list_my_jobs,
        routes::jobs::create_job,
        routes::jobs::get_job,
        routes::jobs::update_job,
        routes::jobs::delete_job,
        routes::jobs::publish_job,
        routes::jobs::unpublish_job,
        routes::jobs::save_job,
        routes::jobs::unsave_job,
        routes::jobs::list_applicants,
        routes::attachments::add_attachments,
        routes::attachments::delete_attachment,
        routes::companies::list_companies,
        routes::companies::list_my_companies,
        routes::companies::create_company,
        routes::companies::get_company,
        routes::companies::update_company,
        routes::companies::follow_company,
        routes::companies::unfollow_company,
        routes::users::get_profile,
        routes::users::upsert_profile,
        routes::users::add_resumes,
        routes::users::delete_resume,
        routes::users::apply_to_job,
        routes::categories::list_categories,
        routes::analytics::overview,
        routes::notifications::send_thank_you,
        routes::notifications::send_selected,
        routes::notifications::send_rejection,
        routes::ai::generate
    ),
    components(schemas(
        search::JobWithRelations,
        routes::jobs::CreateJobRequest,
        routes::jobs::UpdateJobRequest,
        routes::jobs::JobDetailResponse,
        routes::jobs::Applicant,
        routes::companies::CreateCompanyRequest,
        routes::companies::UpdateCompanyRequest,
        routes::companies::CompanyDetailResponse,
        routes::users::ProfileResponse,
        routes::users::UpsertProfileRequest,
        routes::notifications::NotificationRequest,
        routes::ai::GenerateRequest,
        routes::ai::GeneratedText,
        analytics::Overview,
        analytics::MonthlyCount,
        routes::MessageResponse
    ))
)]
pub struct ApiDoc;

/// Create the application with all routes and middleware, without rate limiting.
pub fn create_app(state: AppState) -> Router {
    create_app_with_rate_limit(state, None)
}

/// Create the application; `requests_per_minute` enables per-IP rate limiting
/// on the API routes (documentation routes are never limited).
pub fn create_app_with_rate_limit(state: AppState, requests_per_minute: Option<u32>) -> Router {
    // --- Define API routes separately ---
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/jobs",
            get(routes::jobs::search_jobs).post(routes::jobs::create_job),
        )
        .route("/jobs/mine", get(routes::jobs::list_my_jobs))
        .route(
            "/jobs/{job_id}",
            get(routes::jobs::get_job)
                .patch(routes::jobs::update_job)
                .delete(routes::jobs::delete_job),
        )
        .route("/jobs/{job_id}/publish", patch(routes::jobs::publish_job))
        .route("/jobs/{job_id}/unpublish", patch(routes::jobs::unpublish_job))
        .route("/jobs/{job_id}/save", patch(routes::jobs::save_job))
        .route("/jobs/{job_id}/unsave", patch(routes::jobs::unsave_job))
        .route("/jobs/{job_id}/applicants", get(routes::jobs::list_applicants))
        .route(
            "/jobs/{job_id}/attachments",
            post(routes::attachments::add_attachments),
        )
        .route(
            "/jobs/{job_id}/attachments/{attachment_id}",
            delete(routes::attachments::delete_attachment),
        )
        .route(
            "/companies",
            get(routes::companies::list_companies).post(routes::companies::create_company),
        )
        .route("/companies/mine", get(routes::companies::list_my_companies))
        .route(
            "/companies/{company_id}",
            get(routes::companies::get_company).patch(routes::companies::update_company),
        )
        .route(
            "/companies/{company_id}/follow",
            patch(routes::companies::follow_company),
        )
        .route(
            "/companies/{company_id}/unfollow",
            patch(routes::companies::unfollow_company),
        )
        .route(
            "/users/me",
            get(routes::users::get_profile).patch(routes::users::upsert_profile),
        )
        .route("/users/me/resumes", post(routes::users::add_resumes))
        .route(
            "/users/me/resumes/{resume_id}",
            delete(routes::users::delete_resume),
        )
        .route("/users/me/applied-jobs", patch(routes::users::apply_to_job))
        .route("/categories", get(routes::categories::list_categories))
        .route("/analytics/overview", get(routes::analytics::overview))
        .route("/mail/thank-you", post(routes::notifications::send_thank_you))
        .route("/mail/selected", post(routes::notifications::send_selected))
        .route("/mail/rejection", post(routes::notifications::send_rejection))
        .route("/ai/generate", post(routes::ai::generate))
        .with_state(state);

    // --- Rate limiting applies to the API routes only ---
    let api_routes = match requests_per_minute {
        Some(per_minute) if per_minute > 0 => {
            let governor_conf = GovernorConfigBuilder::default()
                .key_extractor(SmartIpKeyExtractor)
                .period(Duration::from_millis(60_000 / u64::from(per_minute)))
                .burst_size(per_minute)
                .finish();
            match governor_conf {
                Some(conf) => {
                    tracing::info!("Rate limiting API routes to {} requests/minute per IP", per_minute);
                    api_routes.layer(GovernorLayer { config: Arc::new(conf) })
                }
                None => {
                    tracing::warn!("Invalid rate limit configuration; continuing without it");
                    api_routes
                }
            }
        }
        _ => api_routes,
    };

    let docs_router = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // --- Build the final application router ---
    Router::new()
        .merge(api_routes)
        .merge(docs_router)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
