use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// GET /api/v1/presence/{identity}
pub async fn get_presence(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    identity: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let identity = identity.into_inner();
    let online = state.presence.is_online(&identity);
    let live_channel = state.registry.is_connected(&identity).await;

    Ok(HttpResponse::Ok().json(json!({
        "identity": identity,
        "online": online,
        "live_channel": live_channel,
    })))
}
