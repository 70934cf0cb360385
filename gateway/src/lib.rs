//! Gateway library
//!
//! Exposes the gateway pieces as a library so the binary, the integration
//! tests and embedding services share one implementation.

pub mod backend;
pub mod config;
pub mod grpc;
pub mod pipeline;
pub mod router;

pub use backend::{bind, BackendClient, BackendError, BackendMode, BoundBackend, GrpcBackendClient, MockBackend};
pub use config::GatewayConfig;
pub use pipeline::{ApiError, UserRequest, UserResponse};
pub use router::{build_router, AppState};
