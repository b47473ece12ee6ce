//! HTTP Router
//!
//! Sets up the axum router with the gateway endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handler::{
    discover_points, gateway_config, health_check, read_multiple, read_property, who_is, who_is_range,
    write_property,
};
use super::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check for monitoring/load balancers
        .route("/health", get(health_check))
        .route("/config", get(gateway_config))
        .route("/bacnet/whois/:instance", get(who_is))
        .route("/bacnet/whois/:start/:end", get(who_is_range))
        .route("/bacnet/read/:instance/:object", get(read_property))
        .route("/bacnet/write", post(write_property))
        .route("/bacnet/read-multiple", post(read_multiple))
        .route("/bacnet/points/:instance", get(discover_points))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
