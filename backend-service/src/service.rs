//! Backend gRPC service implementation

use chrono::{Local, SecondsFormat};
use tonic::{Request, Response, Status};

use environment::Environment;
use proto::backend::backend_service_server::BackendService;
use proto::backend::{EnhancedRequest, ProcessedResponse};

/// Processing service implementation
pub struct ProcessingService {
    environment: Environment,
    instance_id: String,
}

impl ProcessingService {
    pub fn new(environment: Environment, instance_id: impl Into<String>) -> Self {
        Self {
            environment,
            instance_id: instance_id.into(),
        }
    }
}

#[tonic::async_trait]
impl BackendService for ProcessingService {
    async fn process_request(
        &self,
        request: Request<EnhancedRequest>,
    ) -> Result<Response<ProcessedResponse>, Status> {
        let req = request.into_inner();
        tracing::info!(
            "[{}] Backend received request {} from gateway {}: user={} query={:?}",
            self.environment,
            req.request_id,
            req.gateway_version,
            req.user_id,
            req.query
        );

        let response = ProcessedResponse {
            result: format!(
                "Processed query: {} for user: {} in {} environment",
                req.query, req.user_id, self.environment
            ),
            success: true,
            processing_time: Local::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            backend_instance_id: self.instance_id.clone(),
        };

        tracing::info!(
            "[{}] Backend sending response for {}: {:?}",
            self.environment,
            req.request_id,
            response.result
        );
        Ok(Response::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_id: &str, query: &str) -> Request<EnhancedRequest> {
        Request::new(EnhancedRequest {
            user_id: user_id.to_string(),
            query: query.to_string(),
            timestamp: "2024-01-15T09:00:00Z".to_string(),
            request_id: "8c5a2a4e-8f43-4f6b-9a57-3f0c2b7d1e10".to_string(),
            gateway_version: "v1.0.0".to_string(),
        })
    }

    #[tokio::test]
    async fn test_process_request_formats_result() {
        let service = ProcessingService::new(Environment::Staging, "server-b-instance-001");

        let response = service
            .process_request(request("u1", "hello"))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(
            response.result,
            "Processed query: hello for user: u1 in stg environment"
        );
        assert!(response.success);
        assert_eq!(response.backend_instance_id, "server-b-instance-001");
        assert!(chrono::DateTime::parse_from_rfc3339(&response.processing_time).is_ok());
    }

    #[tokio::test]
    async fn test_process_request_reports_environment() {
        let service = ProcessingService::new(Environment::Qa, "backend-qa");

        let response = service
            .process_request(request("u2", ""))
            .await
            .unwrap()
            .into_inner();

        assert!(response.result.ends_with("in qa environment"));
        assert_eq!(response.backend_instance_id, "backend-qa");
    }
}
