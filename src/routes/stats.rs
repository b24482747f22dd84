use crate::{server::Server, stats::Stats};
use axum::{Json, Router, extract::State, routing::get};

/// Create the request statistics route
pub fn create_stats_routes() -> Router<Server> {
    Router::new().route("/", get(get_stats))
}

async fn get_stats(State(server): State<Server>) -> Json<Stats> {
    Json(server.stats.snapshot().await)
}
