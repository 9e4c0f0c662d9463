use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ScheduleReminderRequest {
    pub event_id: Uuid,
    pub reminder_time: DateTime<Utc>,
}

/// POST /api/v1/reminders
pub async fn schedule_reminder(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<ScheduleReminderRequest>,
) -> Result<HttpResponse, AppError> {
    let reminder = state
        .reminders
        .schedule(&user.identity, body.event_id, body.reminder_time)
        .await?;
    Ok(HttpResponse::Created().json(reminder))
}
