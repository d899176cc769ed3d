use axum::{extract::State, Json};
use chrono::Utc;

use crate::analytics::{self, Overview};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::AppState;

/// Dashboard totals and this year's monthly activity for the caller
#[utoipa::path(
    get,
    path = "/analytics/overview",
    responses(
        (status = 200, description = "Totals and Jan..Dec series", body = Overview),
        (status = 401, description = "Not signed in")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn overview(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Overview>, AppError> {
    Ok(Json(analytics::overview(&state.db, &user_id, Utc::now()).await?))
}
