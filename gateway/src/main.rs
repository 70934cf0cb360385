//! Gateway main entry point
//!
//! Binds the backend client for the selected environment, then serves the
//! HTTP API until Ctrl-C.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use error::AppError;
use gateway_lib::{backend, build_router, AppState, GatewayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway=info,gateway_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration, command line wins over the environment
    let mut config = GatewayConfig::from_env()?;
    if let Some(env) = environment::from_args(&args)? {
        config.environment = env;
    }

    tracing::info!(
        "Starting Gateway v{} in {} environment",
        config.version,
        config.environment
    );

    // Bind the backend before accepting any traffic
    let mut backend = backend::bind(&config)
        .await
        .context("failed to bind backend")?;

    let app = build_router(AppState::new(backend.client(), &config));

    let listener = match tokio::net::TcpListener::bind(&config.http_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            backend.shutdown().await;
            return Err(AppError::bind(config.http_addr.clone(), e).into());
        }
    };
    tracing::info!("[{}] Gateway listening on {}", config.environment, config.http_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await;

    backend.shutdown().await;
    drop(backend);
    served.context("HTTP server failed")?;

    Ok(())
}

fn print_help() {
    println!("Gateway - forwards API requests to the processing backend");
    println!();
    println!("Usage:");
    println!("  gateway [--env <stg|qa>]");
    println!();
    println!("  stg  connect to the real backend at GATEWAY_BACKEND_ADDR");
    println!("  qa   serve an in-process mock backend");
    println!();
    println!("Environment Variables:");
    println!("  GATEWAY_HTTP_ADDR            HTTP listen address (default: 0.0.0.0:8080)");
    println!("  GATEWAY_BACKEND_ADDR         Backend gRPC endpoint (default: http://localhost:50051)");
    println!("  GATEWAY_ENV                  Environment when --env is not given (default: stg)");
    println!("  GATEWAY_BACKEND_TIMEOUT_MS   Deadline for one backend call (default: 10000)");
    println!("  GATEWAY_CONNECT_TIMEOUT_MS   Timeout for connecting to the backend (default: 5000)");
    println!("  GATEWAY_MOCK_DELAY_MS        Mock backend processing delay (default: 100)");
}
