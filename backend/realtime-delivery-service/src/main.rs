use actix_web::{web, App, HttpServer};
use anyhow::Context;
use realtime_delivery_service::{
    config::Config,
    db, handlers, logging,
    metrics::MetricsMiddleware,
    repository::{PgStore, Repositories},
    state::AppState,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let cfg = Arc::new(Config::from_env().context("Failed to load configuration")?);

    let pool = db::init_pool(&cfg)
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(Repositories::postgres(PgStore::new(pool)), Some(cfg.clone()));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let scheduler = if cfg.scheduler.enabled {
        Some(state.scheduler().spawn(&shutdown_tx))
    } else {
        tracing::warn!("reminder scheduler disabled");
        None
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting realtime-delivery-service");

    let app_state = state.clone();
    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let sessions = app_state.sessions.clone();
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(MetricsMiddleware)
            .wrap(TracingLogger::default())
            .configure(|cfg| handlers::configure(cfg, sessions))
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {bind_addr}"))?
    .run()
    .await
    .context("HTTP server error")?;

    tracing::info!("HTTP server stopped, shutting down");
    let _ = shutdown_tx.send(());
    if let Some(handle) = scheduler {
        handle.join().await;
    }
    state.shutdown().await;

    Ok(())
}
