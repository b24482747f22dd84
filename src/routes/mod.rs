pub mod hash;
pub mod health;
pub mod shutdown;
pub mod stats;

pub use hash::create_hash_routes;
pub use health::create_health_routes;
pub use shutdown::create_shutdown_routes;
pub use stats::create_stats_routes;

use crate::error::AppError;
use axum::http::Uri;

/// Fallback for paths no route claims.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
