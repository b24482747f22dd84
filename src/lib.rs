pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod stats;
pub mod store;
pub mod test_utils;

pub use config::Config;
pub use server::Server;
