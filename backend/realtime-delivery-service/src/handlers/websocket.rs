use crate::middleware::extract_session_token;
use crate::state::AppState;
use crate::websocket::{Destination, PushFrame, PushSession};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// GET /ws?token=...
///
/// Browsers cannot set headers on a WebSocket upgrade, so the token may come
/// from the query string; session headers are accepted too.
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    params: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let token = params
        .into_inner()
        .token
        .or_else(|| extract_session_token(&req));
    let identity = state.sessions.validate_session(token.as_deref())?;

    let (connection_id, receiver) = state.registry.register(&identity).await;
    let session = PushSession::new(
        identity.clone(),
        connection_id,
        state.registry.clone(),
        receiver,
    );

    let response = match ws::start(session, &req, stream) {
        Ok(response) => response,
        Err(e) => {
            state.registry.unregister(&identity, connection_id).await;
            return Err(e);
        }
    };

    let ack = PushFrame::connected(&identity);
    state
        .registry
        .publish(&identity, Destination::Connected, ack.payload)
        .await;

    Ok(response)
}
