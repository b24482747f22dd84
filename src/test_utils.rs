use crate::{config::Config, server::Server};

/// Builder for test server instances with a short hashing delay.
pub struct TestServerBuilder {
    config: Config,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.hashing.delay_ms = 20; // keep deferred digests fast in tests
        config.metrics.enabled = false;
        Self { config }
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.hashing.delay_ms = delay_ms;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Server {
        Server::new(self.config)
    }
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
