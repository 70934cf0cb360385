//! gRPC module
//!
//! Re-exports the generated backend contract from the shared proto crate.

pub mod backend_proto {
    pub use proto::backend::*;
}
