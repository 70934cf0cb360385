//! Backend service entry point
//!
//! Serves the `BackendService` gRPC contract on a TCP listener until Ctrl-C.

use tonic::transport::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backend_service::{BackendConfig, ProcessingService};
use error::AppError;
use proto::backend::backend_service_server::BackendServiceServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration, command line wins over the environment
    let mut config = BackendConfig::from_env()?;
    if let Some(env) = environment::from_args(&args)? {
        config.environment = env;
    }

    tracing::info!(
        "Starting backend service v{} in {} environment",
        config.version,
        config.environment
    );

    let addr = config
        .grpc_addr
        .parse::<std::net::SocketAddr>()
        .map_err(|e| AppError::Config(format!("invalid gRPC address {}: {}", config.grpc_addr, e)))?;

    // Reflection lets tools like grpcurl discover the service
    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(proto::FILE_DESCRIPTOR_SET)
        .build_v1()
        .map_err(|e| AppError::Internal(format!("failed to build reflection service: {}", e)))?;

    let service = ProcessingService::new(config.environment, config.instance_id.clone());

    tracing::info!("[{}] Backend listening on {}", config.environment, config.grpc_addr);

    Server::builder()
        .add_service(reflection_service)
        .add_service(BackendServiceServer::new(service))
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .map_err(|e| AppError::bind(config.grpc_addr.clone(), e))?;

    Ok(())
}

fn print_help() {
    println!("Backend Service - processes enriched gateway requests over gRPC");
    println!();
    println!("Usage:");
    println!("  backend-service [--env <stg|qa>]");
    println!();
    println!("Environment Variables:");
    println!("  BACKEND_GRPC_ADDR        gRPC listen address (default: 0.0.0.0:50051)");
    println!("  BACKEND_INSTANCE_ID      Instance id reported in responses");
    println!("  BACKEND_ENV              Environment when --env is not given (default: stg)");
}
