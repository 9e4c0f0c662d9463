use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct OpenConversationRequest {
    #[validate(email)]
    pub participant: String,
}

/// Length is checked on the trimmed content by the dispatcher.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// POST /api/v1/conversations
pub async fn get_or_create_conversation(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<OpenConversationRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let conversation = state
        .conversations
        .get_or_create(&user.identity, &body.participant)
        .await?;
    Ok(HttpResponse::Ok().json(conversation))
}

/// GET /api/v1/conversations
pub async fn list_conversations(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let summaries = state.conversations.list(&user.identity).await?;
    Ok(HttpResponse::Ok().json(summaries))
}

/// GET /api/v1/conversations/{id}/messages
pub async fn get_messages(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let messages = state
        .conversations
        .open(conversation_id.into_inner(), &user.identity)
        .await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// POST /api/v1/conversations/{id}/messages
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let message = state
        .dispatcher
        .send_message(conversation_id.into_inner(), &user.identity, &body.content)
        .await?;
    Ok(HttpResponse::Created().json(message))
}

/// GET /api/v1/conversations/{id}/unread-count
pub async fn unread_count(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let count = state
        .conversations
        .unread_count(conversation_id.into_inner(), &user.identity)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "unread_count": count })))
}
