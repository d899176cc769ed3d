use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::non_blank;
use crate::ai::{clean_reply, plain_prose};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Full prompt sent to the model
    pub prompt: Option<String>,
    /// Also strip wrapping quotes and `*`/`#` markdown markers
    #[serde(default)]
    pub plain: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeneratedText {
    pub text: String,
}

/// Generate form content from a prompt
#[utoipa::path(
    post,
    path = "/ai/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated text, trimmed and without code fences", body = GeneratedText),
        (status = 400, description = "Prompt is missing"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "The model could not be reached")
    ),
    description = "Backs the writing assistant on the job and company forms: tags, descriptions, company overview and why-join-us copy."
)]
#[tracing::instrument(skip(state, payload))]
pub async fn generate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GeneratedText>, AppError> {
    let prompt = non_blank(payload.prompt)
        .ok_or_else(|| AppError::InvalidRequest("Prompt is missing".to_string()))?;

    let reply = state.generator.generate(&prompt).await.map_err(|e| {
        tracing::error!("[AI_GENERATE] user {}: {}", user_id, e);
        AppError::from(e)
    })?;

    let text = if payload.plain { plain_prose(&reply) } else { clean_reply(&reply) };
    Ok(Json(GeneratedText { text }))
}
