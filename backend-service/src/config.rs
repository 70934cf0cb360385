use environment::Environment;

/// Backend service configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// gRPC server address
    pub grpc_addr: String,

    /// Identifier reported back in every response
    pub instance_id: String,

    /// Deployment environment
    pub environment: Environment,

    /// Service version
    pub version: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            grpc_addr: "0.0.0.0:50051".to_string(),
            instance_id: "server-b-instance-001".to_string(),
            environment: Environment::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl BackendConfig {
    /// Create configuration from environment variables
    ///
    /// An unrecognised `BACKEND_ENV` is an error rather than being ignored,
    /// since it decides which environment the service reports.
    pub fn from_env() -> error::Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BACKEND_GRPC_ADDR") {
            config.grpc_addr = addr;
        }

        if let Ok(id) = std::env::var("BACKEND_INSTANCE_ID") {
            if !id.is_empty() {
                config.instance_id = id;
            }
        }

        if let Ok(env) = std::env::var("BACKEND_ENV") {
            config.environment = env.parse()?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BackendConfig::default();
        assert_eq!(config.grpc_addr, "0.0.0.0:50051");
        assert_eq!(config.instance_id, "server-b-instance-001");
        assert_eq!(config.environment, Environment::Staging);
    }
}
