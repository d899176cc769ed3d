use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{non_blank, MessageResponse};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::mail::{self, Notification};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct NotificationRequest {
    /// Recipient address
    pub email: Option<String>,
    /// Recipient name used in the greeting
    pub full_name: Option<String>,
}

async fn deliver(
    state: &AppState,
    notification: Notification,
    payload: NotificationRequest,
) -> Result<Json<MessageResponse>, AppError> {
    let (Some(email), Some(full_name)) = (non_blank(payload.email), non_blank(payload.full_name))
    else {
        return Err(AppError::InvalidRequest(
            "Missing required fields: email or full_name".to_string(),
        ));
    };

    mail::notify(state.mailer.as_ref(), notification, &email, &full_name)
        .await
        .map_err(|e| {
            tracing::error!("[MAIL_SEND]: {}", e);
            AppError::from(e)
        })?;

    Ok(Json(MessageResponse::new("Mail delivered")))
}

/// Thank an applicant for applying
#[utoipa::path(
    post,
    path = "/mail/thank-you",
    request_body = NotificationRequest,
    responses(
        (status = 200, description = "Mail delivered", body = MessageResponse),
        (status = 400, description = "Missing email or name"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Mail could not be sent")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn send_thank_you(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<NotificationRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    deliver(&state, Notification::ThankYou, payload).await
}

/// Tell an applicant they advanced to the next round
#[utoipa::path(
    post,
    path = "/mail/selected",
    request_body = NotificationRequest,
    responses(
        (status = 200, description = "Mail delivered", body = MessageResponse),
        (status = 400, description = "Missing email or name"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Mail could not be sent")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn send_selected(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<NotificationRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    deliver(&state, Notification::Selected, payload).await
}

/// Tell an applicant they were not selected
#[utoipa::path(
    post,
    path = "/mail/rejection",
    request_body = NotificationRequest,
    responses(
        (status = 200, description = "Mail delivered", body = MessageResponse),
        (status = 400, description = "Missing email or name"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Mail could not be sent")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn send_rejection(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<NotificationRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    deliver(&state, Notification::Rejection, payload).await
}
