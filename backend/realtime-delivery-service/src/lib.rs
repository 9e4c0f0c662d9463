pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod security;
pub mod services;
pub mod session;
pub mod state;
pub mod websocket;

pub use error::{AppError, AppResult};
pub use state::AppState;
