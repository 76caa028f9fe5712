//! `api` crate — the HTTP/websocket surface of spec §6.
//!
//! Exposes:
//!   GET    /api/v1/workflows
//!   POST   /api/v1/workflows
//!   GET    /api/v1/workflows/:id
//!   PUT    /api/v1/workflows/:id
//!   DELETE /api/v1/workflows/:id
//!   POST   /api/v1/workflows/:id/activate
//!   POST   /api/v1/workflows/:id/deactivate
//!   POST   /api/v1/workflows/:id/test
//!   GET    /api/v1/executions
//!   GET    /api/v1/executions/stats
//!   GET    /api/v1/executions/ws
//!   GET    /api/v1/executions/:id
//!   POST   /api/v1/executions/:id/replay
//!   POST   /api/v1/executions/:id/cancel
//!   POST   /api/v1/triggers
//!   POST   /webhooks/:token
//!   POST   /webhooks/email

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::ApiConfig;
pub use state::AppState;

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        layer.allow_origin(Any)
    } else {
        match origin.parse::<axum::http::HeaderValue>() {
            Ok(value) => layer.allow_origin(value),
            Err(_) => layer.allow_origin(Any),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    // Route order matters here: `/executions/stats` and `/executions/ws`
    // must be registered before the `/executions/:id` wildcard.
    let workflows = Router::new()
        .route("/", get(handlers::workflows::list).post(handlers::workflows::create))
        .route(
            "/:id",
            get(handlers::workflows::get).put(handlers::workflows::update).delete(handlers::workflows::delete),
        )
        .route("/:id/activate", post(handlers::workflows::activate))
        .route("/:id/deactivate", post(handlers::workflows::deactivate))
        .route("/:id/test", post(handlers::workflows::test));

    let executions = Router::new()
        .route("/", get(handlers::executions::list))
        .route("/stats", get(handlers::executions::stats))
        .route("/ws", get(handlers::ws::upgrade))
        .route("/:id", get(handlers::executions::get))
        .route("/:id/replay", post(handlers::executions::replay))
        .route("/:id/cancel", post(handlers::executions::cancel));

    let triggers = Router::new().route("/", post(handlers::triggers::create));

    let api_router = Router::new()
        .nest("/workflows", workflows)
        .nest("/executions", executions)
        .nest("/triggers", triggers);

    Router::new()
        .nest("/api/v1", api_router)
        .route("/webhooks/email", post(handlers::email::handle_email))
        .route("/webhooks/:token", post(handlers::webhooks::handle_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(bind: &str, state: AppState) -> Result<(), std::io::Error> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("API server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}
