use axum::{extract::State, Json};
use sea_orm::{EntityTrait, QueryOrder};

use crate::entities::category;
use crate::error::AppError;
use crate::AppState;

/// List job categories
#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "All categories sorted by name", body = Vec<category::Model>)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<category::Model>>, AppError> {
    let categories = category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(&state.db)
        .await?;
    Ok(Json(categories))
}
