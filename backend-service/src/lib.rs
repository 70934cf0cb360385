//! Processing backend
//!
//! gRPC service that turns an enriched gateway request into a processed
//! result.

pub mod config;
pub mod service;

pub use config::BackendConfig;
pub use service::ProcessingService;
