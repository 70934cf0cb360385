//! Backend binding
//!
//! Produces the single backend client the gateway uses for every request.
//! In live mode the client is connected to a real backend over the network;
//! in test mode it is connected to an in-process mock through an in-memory
//! transport. Both are the same [`GrpcBackendClient`] type, so the request
//! path never branches on the mode.

pub mod memory;
pub mod mock;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request};

use environment::Environment;
use error::AppError;

use crate::config::GatewayConfig;
use crate::grpc::backend_proto::backend_service_client::BackendServiceClient;
use crate::grpc::backend_proto::{EnhancedRequest, ProcessedResponse};

pub use mock::MockBackend;

/// Errors from a single backend call
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("backend returned {code:?}: {message}")]
    Status { code: Code, message: String },
}

impl From<tonic::Status> for BackendError {
    fn from(status: tonic::Status) -> Self {
        BackendError::Status {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// Capability the gateway needs from a backend.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Send one enriched request, giving up once `deadline` has elapsed.
    async fn process_request(
        &self,
        request: EnhancedRequest,
        deadline: Duration,
    ) -> Result<ProcessedResponse, BackendError>;
}

/// gRPC backend client over an established channel.
///
/// Cloning is cheap and every clone shares the underlying connection.
#[derive(Debug, Clone)]
pub struct GrpcBackendClient {
    inner: BackendServiceClient<Channel>,
}

impl GrpcBackendClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: BackendServiceClient::new(channel),
        }
    }

    /// Connect eagerly to a backend listening on the network.
    pub async fn connect(addr: &str, connect_timeout: Duration) -> error::Result<Self> {
        let endpoint = Endpoint::from_shared(addr.to_string())
            .map_err(|e| AppError::Config(format!("invalid backend address {}: {}", addr, e)))?
            .connect_timeout(connect_timeout);

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| AppError::connection(addr, e))?;

        Ok(Self::new(channel))
    }
}

#[async_trait]
impl BackendClient for GrpcBackendClient {
    async fn process_request(
        &self,
        request: EnhancedRequest,
        deadline: Duration,
    ) -> Result<ProcessedResponse, BackendError> {
        let mut client = self.inner.clone();

        // Propagate the deadline to the backend as grpc-timeout as well
        let mut request = Request::new(request);
        request.set_timeout(deadline);

        match tokio::time::timeout(deadline, client.process_request(request)).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) if status.code() == Code::DeadlineExceeded => {
                Err(BackendError::DeadlineExceeded(deadline))
            }
            Ok(Err(status)) => Err(status.into()),
            Err(_) => Err(BackendError::DeadlineExceeded(deadline)),
        }
    }
}

/// How the backend client is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Dial the real backend over the network
    Live,
    /// Serve an in-process mock over the in-memory transport
    Test,
}

impl From<Environment> for BackendMode {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Staging => BackendMode::Live,
            Environment::Qa => BackendMode::Test,
        }
    }
}

/// Backend client bound at startup, plus whatever it needs torn down.
pub struct BoundBackend {
    mode: BackendMode,
    client: Arc<dyn BackendClient>,
    mock: Option<MockBackend>,
}

impl BoundBackend {
    #[cfg(test)]
    fn mode(&self) -> BackendMode {
        self.mode
    }

    /// Shared handle for request handlers
    pub fn client(&self) -> Arc<dyn BackendClient> {
        self.client.clone()
    }

    /// Release background resources. Safe to call more than once.
    ///
    /// In test mode this tears the mock down. In live mode there is nothing
    /// to stop: the channel closes once the last client handle is dropped,
    /// which for the gateway is when the `BoundBackend` itself goes away
    /// after the HTTP server has stopped.
    pub async fn shutdown(&mut self) {
        match self.mode {
            BackendMode::Test => {
                if let Some(mock) = self.mock.as_mut() {
                    mock.shutdown().await;
                }
            }
            BackendMode::Live => {
                tracing::debug!(
                    "Live backend channel closes with its last client handle ({} left)",
                    Arc::strong_count(&self.client)
                );
            }
        }
    }
}

/// Bind the backend client for the configured environment.
///
/// Fails fast: if the live backend cannot be reached or the mock cannot be
/// started, the gateway must not start serving.
pub async fn bind(config: &GatewayConfig) -> error::Result<BoundBackend> {
    let mode = BackendMode::from(config.environment);

    match mode {
        BackendMode::Live => {
            tracing::info!(
                "[{}] Connecting to backend at {}",
                config.environment,
                config.backend_addr
            );
            let client =
                GrpcBackendClient::connect(&config.backend_addr, config.connect_timeout()).await?;
            Ok(BoundBackend {
                mode,
                client: Arc::new(client),
                mock: None,
            })
        }
        BackendMode::Test => {
            tracing::info!("[{}] Using mock backend", config.environment);
            let (client, mock) = MockBackend::spawn(config.mock_delay()).await?;
            Ok(BoundBackend {
                mode,
                client: Arc::new(client),
                mock: Some(mock),
            })
        }
    }
}
