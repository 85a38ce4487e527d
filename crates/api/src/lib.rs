//! `api` crate — the External Surface of spec §6 as an axum HTTP service.
//!
//! Exposes:
//!   POST   /api/v1/executions
//!   POST   /api/v1/executions/:id/resume
//!   GET    /api/v1/executions/:id
//!   GET    /api/v1/executions/:id/node-executions
//!   GET    /api/v1/executions
//!   GET    /api/v1/metrics/:node_id
//!
//! CORS policy is an external collaborator concern (spec §1): `serve` takes
//! the `CorsLayer` as a parameter rather than hardcoding one. Tracing stays
//! wired in here, matching the teacher.

pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use engine::Runtime;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Runtime,
}

pub async fn serve(bind: &str, runtime: Runtime, cors: CorsLayer) -> Result<(), std::io::Error> {
    let state = AppState { runtime };

    let api_router = Router::new()
        .route("/executions", post(handlers::executions::execute).get(handlers::executions::list_executions))
        .route("/executions/:id", get(handlers::executions::get_execution))
        .route("/executions/:id/resume", post(handlers::executions::resume))
        .route("/executions/:id/node-executions", get(handlers::executions::list_node_executions))
        .route("/metrics/:node_id", get(handlers::metrics::get_service_metric));

    let app = Router::new()
        .nest("/api/v1", api_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
