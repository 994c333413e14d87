//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use glados_config::{Config, EngineConfig, HealthConfig, ServerConfig};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Minimal configuration; the test server fills in the audio directory
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                    ..ServerConfig::default()
                },
                engine: EngineConfig {
                    eager_load: true,
                    ..EngineConfig::default()
                },
                telemetry: None,
            },
        }
    }

    pub fn with_root_path(mut self, root_path: &str) -> Self {
        self.config.server.root_path = root_path.to_owned();
        self
    }

    pub fn with_health_path(mut self, path: &str) -> Self {
        self.config.server.health.path = path.to_owned();
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Defer warm-up to the first request
    pub fn lazy(mut self) -> Self {
        self.config.engine.eager_load = false;
        self
    }

    pub fn with_audio_format(mut self, format: &str) -> Self {
        self.config.engine.audio_format = format.to_owned();
        self
    }

    /// Set the prefix without going through config validation
    pub fn with_filename_prefix(mut self, prefix: &str) -> Self {
        self.config.engine.filename_prefix = prefix.to_owned();
        self
    }

    pub fn with_request_timeout(mut self, timeout: &str) -> Self {
        self.config.engine.request_timeout = timeout.to_owned();
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
