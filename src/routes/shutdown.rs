use crate::server::Server;
use axum::{Json, Router, extract::State, routing::post};
use serde_json::{Value, json};

/// Create the shutdown trigger route
pub fn create_shutdown_routes() -> Router<Server> {
    Router::new().route("/", post(request_shutdown))
}

/// `POST /shutdown` — idempotent; every caller gets the same outcome no
/// matter how many requests race.
async fn request_shutdown(State(server): State<Server>) -> Json<Value> {
    server.shutdown_coordinator.initiate_shutdown();
    Json(json!({ "status": "shutting down" }))
}
