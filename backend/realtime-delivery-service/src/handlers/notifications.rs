/// Notification inbox handlers
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::NotificationType;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNotificationRequest {
    #[validate(email)]
    pub recipient: String,
    pub notification_type: NotificationType,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    pub reference_id: Option<Uuid>,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let notifications = state.inbox.list(&user.identity, query.limit).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let count = state.inbox.unread_count(&user.identity).await?;
    Ok(HttpResponse::Ok().json(json!({ "unread_count": count })))
}

/// PUT /api/v1/notifications/{id}/read
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    notification_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .inbox
        .mark_read(notification_id.into_inner(), &user.identity)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// PUT /api/v1/notifications/read-all
pub async fn mark_all_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let updated = state.inbox.mark_all_read(&user.identity).await?;
    Ok(HttpResponse::Ok().json(json!({ "updated": updated })))
}

/// POST /api/v1/notifications
pub async fn create_notification(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreateNotificationRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let notification = state
        .inbox
        .create(
            &user.identity,
            &body.recipient,
            body.notification_type,
            &body.content,
            body.reference_id,
        )
        .await?;
    Ok(HttpResponse::Created().json(notification))
}
