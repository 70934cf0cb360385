//! Mock backend for QA and tests
//!
//! Serves the real `BackendService` contract from a background task over
//! the in-memory transport, so the gateway dials it exactly like the real
//! backend. It is never exposed on a socket.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, SecondsFormat};
use hyper_util::rt::TokioIo;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::transport::{Endpoint, Server, Uri};
use tonic::{Request, Response, Status};
use tower::service_fn;

use error::AppError;

use super::memory::{self, InMemoryConnector};
use super::GrpcBackendClient;
use crate::grpc::backend_proto::backend_service_server::{BackendService, BackendServiceServer};
use crate::grpc::backend_proto::{EnhancedRequest, ProcessedResponse};

/// Instance id reported by the mock in every response
pub const MOCK_INSTANCE_ID: &str = "mock-backend-instance";

/// How long shutdown waits for the serve loop before aborting it
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Placeholder authority, the in-memory connector ignores it
const IN_MEMORY_URI: &str = "http://in-memory.backend";

/// Mock implementation of the backend contract
struct MockProcessingService {
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

#[tonic::async_trait]
impl BackendService for MockProcessingService {
    async fn process_request(
        &self,
        request: Request<EnhancedRequest>,
    ) -> Result<Response<ProcessedResponse>, Status> {
        let req = request.into_inner();
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            "[MOCK] Received request {} for user {}: {:?}",
            req.request_id,
            req.user_id,
            req.query
        );

        // Simulate processing time
        tokio::time::sleep(self.delay).await;

        Ok(Response::new(ProcessedResponse {
            result: format!("Mock response for query: {}", req.query),
            success: true,
            processing_time: Local::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            backend_instance_id: MOCK_INSTANCE_ID.to_string(),
        }))
    }
}

/// Running mock backend.
///
/// Owns the in-memory listener and the serve loop task. Call
/// [`MockBackend::shutdown`] to release them.
pub struct MockBackend {
    connector: InMemoryConnector,
    shutdown_tx: Option<oneshot::Sender<()>>,
    serve_task: Option<JoinHandle<Result<(), tonic::transport::Error>>>,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Start the mock and dial it.
    ///
    /// `delay` is the artificial processing time of every call. Returns a
    /// client connected over the in-memory transport together with the
    /// handle that tears the mock down.
    pub async fn spawn(delay: Duration) -> error::Result<(GrpcBackendClient, MockBackend)> {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = MockProcessingService {
            delay,
            calls: calls.clone(),
        };

        let (connector, incoming) = memory::listen(memory::DEFAULT_BUFFER_SIZE);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let serve_task = tokio::spawn(async move {
            let result = Server::builder()
                .add_service(BackendServiceServer::new(service))
                .serve_with_incoming_shutdown(incoming.into_stream(), async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = &result {
                tracing::error!("[MOCK] Serve loop failed: {}", e);
            }
            result
        });

        let mut mock = MockBackend {
            connector: connector.clone(),
            shutdown_tx: Some(shutdown_tx),
            serve_task: Some(serve_task),
            calls,
        };

        let client = match dial(connector).await {
            Ok(client) => client,
            Err(e) => {
                mock.shutdown().await;
                return Err(e);
            }
        };

        tracing::info!("[MOCK] Mock backend serving on in-memory transport");
        Ok((client, mock))
    }

    /// Number of requests the mock has received
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether shutdown has already run
    #[cfg(test)]
    fn is_shut_down(&self) -> bool {
        self.shutdown_tx.is_none()
    }

    /// Tear the mock down.
    ///
    /// Closes the listener, then stops the serve loop. Stopping the serve loop
    /// closes every client connection from the server side, and the closed
    /// listener refuses the reconnect, so outstanding clients fail with
    /// `Unavailable` from then on. Later calls do nothing.
    pub async fn shutdown(&mut self) {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            tracing::debug!("[MOCK] Mock backend already shut down");
            return;
        };

        self.connector.close().await;
        let _ = shutdown_tx.send(());

        if let Some(mut task) = self.serve_task.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!("[MOCK] Serve loop task failed: {}", e),
                Err(_) => {
                    tracing::warn!(
                        "[MOCK] Serve loop still running after {:?}, aborting",
                        SHUTDOWN_GRACE
                    );
                    task.abort();
                    let _ = task.await;
                }
            }
        }

        tracing::info!("[MOCK] Mock backend shut down");
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        // Never leave the serve loop running past the handle
        if let Some(task) = self.serve_task.take() {
            task.abort();
        }
    }
}

/// Dial the mock over the in-memory transport.
async fn dial(connector: InMemoryConnector) -> error::Result<GrpcBackendClient> {
    let channel = Endpoint::from_static(IN_MEMORY_URI)
        .connect_with_connector(service_fn(move |_: Uri| {
            let connector = connector.clone();
            async move { connector.dial().await.map(TokioIo::new) }
        }))
        .await
        .map_err(|e| AppError::connection("in-memory mock backend", e))?;

    Ok(GrpcBackendClient::new(channel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendClient, BackendError};

    fn request(query: &str) -> EnhancedRequest {
        EnhancedRequest {
            user_id: "u1".to_string(),
            query: query.to_string(),
            timestamp: "2024-01-15T09:00:00Z".to_string(),
            request_id: "req-1".to_string(),
            gateway_version: "v1.0.0".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_round_trip() {
        let (client, mut mock) = MockBackend::spawn(Duration::from_millis(10)).await.unwrap();

        let response = client
            .process_request(request("hello"), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.result, "Mock response for query: hello");
        assert!(response.success);
        assert_eq!(response.backend_instance_id, MOCK_INSTANCE_ID);
        assert!(chrono::DateTime::parse_from_rfc3339(&response.processing_time).is_ok());
        assert_eq!(mock.call_count(), 1);

        mock.shutdown().await;
    }

    #[tokio::test]
    async fn test_deadline_shorter_than_delay() {
        let (client, mut mock) = MockBackend::spawn(Duration::from_secs(2)).await.unwrap();

        let deadline = Duration::from_millis(100);
        let started = tokio::time::Instant::now();
        let result = client.process_request(request("slow"), deadline).await;
        let elapsed = started.elapsed();

        assert!(result.is_err());
        assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);

        mock.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (client, mut mock) = MockBackend::spawn(Duration::ZERO).await.unwrap();
        assert!(!mock.is_shut_down());

        mock.shutdown().await;
        assert!(mock.is_shut_down());
        assert!(mock.connector.is_closed().await);
        assert!(mock.serve_task.is_none());

        // Second call is a no-op
        mock.shutdown().await;

        // Nothing can be dialed any more, and the client that was handed out
        // has lost its connection
        assert!(mock.connector.dial().await.is_err());
        let result = client
            .process_request(request("after shutdown"), Duration::from_secs(1))
            .await;
        assert!(matches!(
            result,
            Err(BackendError::Status { code: tonic::Code::Unavailable, .. })
        ));
        assert_eq!(mock.call_count(), 0);
    }
}
