use crate::store::HashStore;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{signal, sync::watch, time::timeout};
use tracing::{error, info, warn};

/// Lifecycle of the service: transitions only move forward, and each
/// transition happens at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    ShuttingDown,
    Stopped,
}

/// Graceful shutdown coordinator.
///
/// The first `initiate_shutdown` call wins the latch and broadcasts the
/// shutdown signal; every later call is a no-op that observes the same
/// outcome. `mark_stopped` fires the completion signal exactly once.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_requested: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    stopped: Arc<AtomicBool>,
    stopped_tx: watch::Sender<bool>,
    stopped_rx: watch::Receiver<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (stopped_tx, stopped_rx) = watch::channel(false);
        Self {
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            shutdown_rx,
            stopped: Arc::new(AtomicBool::new(false)),
            stopped_tx,
            stopped_rx,
        }
    }

    /// Get a receiver for the shutdown broadcast.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> ServiceState {
        if self.stopped.load(Ordering::Relaxed) {
            ServiceState::Stopped
        } else if self.is_shutdown_requested() {
            ServiceState::ShuttingDown
        } else {
            ServiceState::Running
        }
    }

    /// Initiate graceful shutdown. Idempotent under concurrent callers.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            info!("Initiating graceful shutdown...");
            if let Err(e) = self.shutdown_tx.send(true) {
                error!("Failed to broadcast shutdown signal: {}", e);
            }
        }
    }

    /// Release the completion signal. Only the first call fires it.
    pub fn mark_stopped(&self) {
        if self
            .stopped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            if let Err(e) = self.stopped_tx.send(true) {
                error!("Failed to broadcast completion signal: {}", e);
            }
        }
    }

    /// Block until `mark_stopped` has fired. Returns immediately if it
    /// already has.
    pub async fn wait_for_stopped(&self) {
        let mut rx = self.stopped_rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for SIGINT/SIGTERM and turn it into a shutdown request.
    pub async fn wait_for_shutdown_signal(&self) {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C signal");
            },
            _ = terminate => {
                info!("Received terminate signal");
            },
        }

        self.initiate_shutdown();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for components that need a hook during graceful shutdown.
#[async_trait::async_trait]
pub trait GracefulShutdown {
    /// Component name for logging
    fn name(&self) -> &str;

    async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Runs registered components' shutdown hooks in order, each bounded by
/// the same timeout.
pub struct ShutdownManager {
    components: Vec<Box<dyn GracefulShutdown + Send + Sync>>,
    timeout_duration: Duration,
}

impl ShutdownManager {
    pub fn new(timeout_duration: Duration) -> Self {
        Self {
            components: Vec::new(),
            timeout_duration,
        }
    }

    pub fn register<T>(&mut self, component: T)
    where
        T: GracefulShutdown + Send + Sync + 'static,
    {
        self.components.push(Box::new(component));
    }

    pub async fn shutdown_all(&self) {
        info!("Shutting down {} components...", self.components.len());

        for component in &self.components {
            let component_name = component.name();

            match timeout(self.timeout_duration, component.shutdown()).await {
                Ok(Ok(())) => {
                    info!("Successfully shut down component: {}", component_name);
                }
                Ok(Err(e)) => {
                    error!("Error shutting down component {}: {}", component_name, e);
                }
                Err(_) => {
                    error!("Timeout shutting down component: {}", component_name);
                }
            }
        }

        info!("Shutdown complete");
    }
}

/// Shutdown hook for the hash store.
///
/// Deliberately does not wait for in-flight digest computations; they are
/// abandoned with the process, matching the poll-until-present contract.
pub struct StoreShutdown {
    store: HashStore,
}

impl StoreShutdown {
    pub fn new(store: HashStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl GracefulShutdown for StoreShutdown {
    fn name(&self) -> &str {
        "Hash Store"
    }

    async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let pending = self.store.pending();
        if pending > 0 {
            warn!("Abandoning {} in-flight digest computations", pending);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct TestComponent {
        name: String,
        shutdown_count: Arc<AtomicUsize>,
        should_fail: bool,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl GracefulShutdown for TestComponent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            tokio::time::sleep(self.delay).await;
            self.shutdown_count.fetch_add(1, Ordering::SeqCst);

            if self.should_fail {
                Err("Test failure".into())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_running() {
        let coordinator = ShutdownCoordinator::new();
        assert_eq!(coordinator.state(), ServiceState::Running);
        assert!(!coordinator.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_initiate_shutdown_broadcasts_once() {
        let coordinator = ShutdownCoordinator::new();
        let mut rx = coordinator.subscribe();

        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown();

        assert_eq!(coordinator.state(), ServiceState::ShuttingDown);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        // The second call produced no further broadcast.
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_shutdown_requests_race_safely() {
        let coordinator = ShutdownCoordinator::new();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator.initiate_shutdown();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(coordinator.state(), ServiceState::ShuttingDown);
    }

    #[tokio::test]
    async fn test_wait_for_stopped_unblocks_all_waiters() {
        let coordinator = ShutdownCoordinator::new();

        let early_waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.wait_for_stopped().await })
        };

        coordinator.mark_stopped();
        coordinator.mark_stopped();

        early_waiter.await.unwrap();
        // A waiter arriving after the signal returns immediately.
        coordinator.wait_for_stopped().await;
        assert_eq!(coordinator.state(), ServiceState::Stopped);
    }

    #[tokio::test]
    async fn test_shutdown_manager_runs_all_components() {
        let shutdown_count = Arc::new(AtomicUsize::new(0));

        let mut manager = ShutdownManager::new(Duration::from_secs(1));
        manager.register(TestComponent {
            name: "Component1".to_string(),
            shutdown_count: shutdown_count.clone(),
            should_fail: false,
            delay: Duration::from_millis(10),
        });
        manager.register(TestComponent {
            name: "FailingComponent".to_string(),
            shutdown_count: shutdown_count.clone(),
            should_fail: true,
            delay: Duration::from_millis(10),
        });

        manager.shutdown_all().await;

        // Both hooks ran, even though one failed.
        assert_eq!(shutdown_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_manager_timeout() {
        let shutdown_count = Arc::new(AtomicUsize::new(0));

        let mut manager = ShutdownManager::new(Duration::from_millis(20));
        manager.register(TestComponent {
            name: "SlowComponent".to_string(),
            shutdown_count: shutdown_count.clone(),
            should_fail: false,
            delay: Duration::from_millis(200),
        });

        // Must return despite the slow component.
        manager.shutdown_all().await;
    }

    #[tokio::test]
    async fn test_store_shutdown_does_not_wait_for_pending_digests() {
        let store = HashStore::new(Duration::from_secs(60));
        store.submit("still-pending");

        let hook = StoreShutdown::new(store.clone());
        assert_eq!(hook.name(), "Hash Store");

        let started = std::time::Instant::now();
        hook.shutdown().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(store.pending(), 1);
    }
}
