use crate::{server::Server, shutdown::ServiceState};
use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};

/// Create the health check route
pub fn create_health_routes() -> Router<Server> {
    Router::new().route("/", get(health_check))
}

async fn health_check(State(server): State<Server>) -> Json<Value> {
    let state = match server.shutdown_coordinator.state() {
        ServiceState::Running => "running",
        ServiceState::ShuttingDown => "shutting_down",
        ServiceState::Stopped => "stopped",
    };

    Json(json!({
        "status": "healthy",
        "service": "hashd",
        "version": env!("CARGO_PKG_VERSION"),
        "state": state,
        "pending_digests": server.store.pending(),
    }))
}
