use crate::{
    config::Config,
    error::AppError,
    metrics,
    routes::{
        create_hash_routes, create_health_routes, create_shutdown_routes, create_stats_routes,
        not_found,
    },
    shutdown::{ShutdownCoordinator, ShutdownManager, StoreShutdown},
    stats::{self, StatsAggregator},
    store::HashStore,
};
use axum::{Router, middleware};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared application state: the record store, the stats aggregator, and
/// the shutdown coordinator, all constructed once at startup.
#[derive(Clone)]
pub struct Server {
    pub config: Arc<Config>,
    pub store: HashStore,
    pub stats: StatsAggregator,
    pub shutdown_coordinator: Arc<ShutdownCoordinator>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let store = HashStore::new(Duration::from_millis(config.hashing.delay_ms));
        Self {
            config: Arc::new(config),
            store,
            stats: StatsAggregator::new(),
            shutdown_coordinator: Arc::new(ShutdownCoordinator::new()),
        }
    }

    pub async fn run(&self) -> Result<(), AppError> {
        let _metrics_handle = if self.config.metrics.enabled {
            match metrics::init_metrics_with_port(self.config.metrics.port) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!(
                        "Failed to start metrics server on port {}: {}",
                        self.config.metrics.port, e
                    );
                    return Err(AppError::Internal(format!(
                        "Failed to start metrics server: {}",
                        e
                    )));
                }
            }
        } else {
            None
        };

        let mut shutdown_manager = ShutdownManager::new(Duration::from_secs(30));
        shutdown_manager.register(StoreShutdown::new(self.store.clone()));

        let app = self.create_app();

        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid listen address: {}", e)))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind to address: {}", e)))?;

        info!("Server listening on http://{}", addr);

        // Unix signals feed the same run-once latch as POST /shutdown.
        let shutdown_coordinator = self.shutdown_coordinator.clone();
        tokio::spawn(async move {
            shutdown_coordinator.wait_for_shutdown_signal().await;
        });

        let mut shutdown_rx = self.shutdown_coordinator.subscribe();
        let serve_future = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            info!("Graceful shutdown initiated");
        });

        if let Err(e) = serve_future.await {
            error!("Server error: {}", e);
        }

        // In-flight requests have drained; run component hooks, then fire
        // the completion signal exactly once.
        shutdown_manager.shutdown_all().await;
        self.shutdown_coordinator.mark_stopped();
        info!("Server shutdown complete");

        Ok(())
    }

    // Creates the application router
    pub fn create_app(&self) -> Router {
        let mut app = Router::new()
            .nest("/hash", self.hash_routes())
            .nest("/stats", create_stats_routes())
            .nest("/shutdown", create_shutdown_routes())
            .nest("/health", create_health_routes())
            .fallback(not_found)
            .with_state(self.clone());

        if self.config.metrics.enabled {
            app = app.layer(middleware::from_fn(metrics::metrics_middleware));
        }
        app
    }

    /// Hash routes with per-request latency recording layered on top.
    fn hash_routes(&self) -> Router<Server> {
        create_hash_routes().layer(middleware::from_fn_with_state(
            self.clone(),
            stats::track_request_latency,
        ))
    }
}
