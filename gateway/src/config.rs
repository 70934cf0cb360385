use std::time::Duration;

use environment::Environment;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP listen address
    pub http_addr: String,

    /// Backend gRPC endpoint, dialed in live mode
    pub backend_addr: String,

    /// Deployment environment, selects the backend binding
    pub environment: Environment,

    /// Deadline for one backend call in milliseconds
    pub backend_timeout_ms: u64,

    /// Timeout for establishing the live backend connection in milliseconds
    pub connect_timeout_ms: u64,

    /// Artificial processing delay of the mock backend in milliseconds
    pub mock_delay_ms: u64,

    /// Service version
    pub version: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            backend_addr: "http://localhost:50051".to_string(),
            environment: Environment::default(),
            backend_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            mock_delay_ms: 100,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl GatewayConfig {
    /// Create configuration from environment variables
    ///
    /// Numeric values that do not parse are ignored. An unrecognised
    /// `GATEWAY_ENV` is an error.
    pub fn from_env() -> error::Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("GATEWAY_HTTP_ADDR") {
            config.http_addr = addr;
        }

        if let Ok(addr) = std::env::var("GATEWAY_BACKEND_ADDR") {
            config.backend_addr = addr;
        }

        if let Ok(env) = std::env::var("GATEWAY_ENV") {
            config.environment = env.parse()?;
        }

        if let Ok(timeout) = std::env::var("GATEWAY_BACKEND_TIMEOUT_MS") {
            if let Ok(n) = timeout.parse() {
                config.backend_timeout_ms = n;
            }
        }

        if let Ok(timeout) = std::env::var("GATEWAY_CONNECT_TIMEOUT_MS") {
            if let Ok(n) = timeout.parse() {
                config.connect_timeout_ms = n;
            }
        }

        if let Ok(delay) = std::env::var("GATEWAY_MOCK_DELAY_MS") {
            if let Ok(n) = delay.parse() {
                config.mock_delay_ms = n;
            }
        }

        Ok(config)
    }

    /// Get backend call deadline as Duration
    ///
    /// Never zero, a backend call always gets some finite budget.
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms.max(1))
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get mock processing delay as Duration
    pub fn mock_delay(&self) -> Duration {
        Duration::from_millis(self.mock_delay_ms)
    }

    /// Version tag stamped on every enriched request
    pub fn gateway_version(&self) -> String {
        format!("v{}", self.version)
    }
}
