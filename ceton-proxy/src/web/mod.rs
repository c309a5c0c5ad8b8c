//! REST API and status page.

pub mod api;
pub mod dashboard;
pub mod state;

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::WebState;

/// Build the application router.
pub fn router(web_state: Arc<WebState>) -> Router {
    Router::new()
        // Stream allocation
        .route("/api/stream", post(api::allocate_stream))
        .route("/api/stream/:tuner", delete(api::release_stream))
        // Status
        .route("/api/tuners", get(api::get_tuners))
        .route("/api/tuners/reconcile", post(api::reconcile_tuners))
        .route("/api/devices", get(api::get_devices))
        .route("/api/channels", get(api::get_channels))
        .route("/api/stats", get(api::get_stats))
        // Dashboard route
        .route("/", get(dashboard::index))
        .with_state(web_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the REST server.
pub async fn start_web_server(
    listen_addr: SocketAddr,
    web_state: Arc<WebState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(web_state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    log::info!("REST API listening on http://{}", listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
