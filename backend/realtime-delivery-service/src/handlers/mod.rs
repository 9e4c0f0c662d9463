/// HTTP handlers
pub mod auth;
pub mod conversations;
pub mod notifications;
pub mod presence;
pub mod reminders;
pub mod websocket;

use crate::metrics;
use crate::middleware::SessionAuthMiddleware;
use crate::session::SessionStore;
use actix_web::{web, HttpResponse};

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Register every route. `sessions` guards the authenticated scope.
pub fn configure(cfg: &mut web::ServiceConfig, sessions: SessionStore) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics::serve_metrics))
        .route("/ws", web::get().to(websocket::ws_handler))
        .route("/api/v1/auth/login", web::post().to(auth::login))
        .service(
            web::scope("/api/v1")
                .wrap(SessionAuthMiddleware::new(sessions))
                .service(
                    web::resource("/session")
                        .route(web::get().to(auth::current_session))
                        .route(web::delete().to(auth::logout)),
                )
                .route("/presence/{identity}", web::get().to(presence::get_presence))
                .service(
                    web::resource("/conversations")
                        .route(web::get().to(conversations::list_conversations))
                        .route(web::post().to(conversations::get_or_create_conversation)),
                )
                .service(
                    web::resource("/conversations/{id}/messages")
                        .route(web::get().to(conversations::get_messages))
                        .route(web::post().to(conversations::send_message)),
                )
                .route(
                    "/conversations/{id}/unread-count",
                    web::get().to(conversations::unread_count),
                )
                .service(
                    web::resource("/notifications")
                        .route(web::get().to(notifications::list_notifications))
                        .route(web::post().to(notifications::create_notification)),
                )
                .route(
                    "/notifications/unread-count",
                    web::get().to(notifications::unread_count),
                )
                .route(
                    "/notifications/read-all",
                    web::put().to(notifications::mark_all_read),
                )
                .route(
                    "/notifications/{id}/read",
                    web::put().to(notifications::mark_read),
                )
                .route("/reminders", web::post().to(reminders::schedule_reminder)),
        );
}
