//! Shared protobuf definitions for all services
//!
//! This crate provides the generated gRPC code for the processing backend
//! contract. Enable the `reflection` feature to also export the encoded
//! file descriptor set for `tonic-reflection`.

/// Backend proto definitions
pub mod backend {
    tonic::include_proto!("backend");
}

// Re-export commonly used types for convenience
pub use backend::*;

/// File descriptor set for gRPC reflection
#[cfg(feature = "reflection")]
pub const FILE_DESCRIPTOR_SET: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/backend_descriptor.bin"));
