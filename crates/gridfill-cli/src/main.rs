#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use gridfill_server::handler::routes;
use gridfill_server::middleware::{
    RouterObservabilityExt, RouterOpenApiExt, RouterRecoveryExt, RouterSecurityExt,
};
use gridfill_server::pipeline::{PipelineState, WorkerHandles};
use gridfill_server::service::ServiceState;

use crate::config::{Cli, MiddlewareConfig};
use crate::server::ServerError;

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "gridfill_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "gridfill_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "gridfill_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    let exit_code = error
        .downcast_ref::<ServerError>()
        .map_or(1, ServerError::exit_code);
    process::exit(exit_code);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    Cli::init_tracing();

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting gridfill"
    );

    cli.log();
    cli.validate()?;

    let nats = cli
        .service
        .connect_nats()
        .await
        .context("failed to connect to NATS")?;
    let state = ServiceState::from_config(&cli.service, &nats)
        .await
        .context("failed to create service state")?;

    let pipeline = PipelineState::new(&state, nats, cli.pipeline.clone());
    let subscriber = pipeline
        .join_consumer_group()
        .await
        .context("failed to join the worker consumer group")?;
    let workers = WorkerHandles::spawn(&pipeline, subscriber);

    let router = create_router(state, &cli.middleware);
    let served = server::serve(router, &cli.server, server::shutdown_signal()).await;

    workers.shutdown();
    let drained = tokio::time::timeout(cli.server.shutdown_timeout(), workers.wait()).await;

    served?;
    match drained {
        Ok(result) => result.map_err(ServerError::Worker)?,
        Err(_) => {
            return Err(ServerError::WorkerTimeout {
                timeout_secs: cli.server.shutdown_timeout,
            }
            .into());
        }
    }

    Ok(())
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Recovery (outermost) - catches panics and enforces timeouts
/// 2. Observability - request IDs and tracing spans
/// 3. Security - CORS and body limits
/// 4. Routes (innermost) - handlers and the OpenAPI document
fn create_router(state: ServiceState, middleware: &MiddlewareConfig) -> Router {
    let api_routes: Router = routes()
        .with_open_api(&middleware.openapi)
        .with_state(state);

    api_routes
        .with_security(&middleware.cors)
        .with_observability()
        .with_recovery(&middleware.recovery)
}
