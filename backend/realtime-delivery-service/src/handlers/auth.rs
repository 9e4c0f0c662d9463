use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub identity: String,
}

/// POST /api/v1/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let LoginRequest { email, password } = body.into_inner();

    if !state.repos.users.verify_credentials(&email, &password).await? {
        tracing::info!(identity = %email, "login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.sessions.create_session(&email);
    tracing::info!(identity = %email, "login succeeded");

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        identity: email,
    }))
}

/// GET /api/v1/session
pub async fn current_session(user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(serde_json::json!({ "identity": user.identity })))
}

/// DELETE /api/v1/session
pub async fn logout(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.sessions.destroy_session(&user.token);
    tracing::info!(identity = %user.identity, "logout");
    Ok(HttpResponse::NoContent().finish())
}
