//! Clinical Copilot server
//!
//! HTTP API for recording consultations: a doctor uploads the audio of a
//! visit, the server transcribes it, files it against a patient (found or
//! created from whatever identifying data came with the upload), renders an
//! EHR note and, when a diagnosis provider is configured, attaches an AI
//! suggestion. Everything is served under `/api`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod services;
pub mod validation;

pub use config::AppConfig;
pub use error::*;
pub use server::{AnonymousAccess, CopilotServer, ServerComponents};

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the application router with all routes and middleware
pub fn create_app(server: CopilotServer) -> Router {
    let cors = middleware::create_cors_layer(&server.cors_allowed_origins);

    routes::create_routes(server.max_upload_bytes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
