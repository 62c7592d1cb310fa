//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig          # Host, port, shutdown
//! ├── middleware: MiddlewareConfig  # CORS, OpenAPI, request timeout
//! ├── service: ServiceConfig        # NATS, completion backend, batch TTL
//! └── pipeline: PipelineConfig      # Consumer group and worker tuning
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! gridfill --nats-url nats://127.0.0.1:4222 --port 8080
//!
//! NATS_URL=nats://127.0.0.1:4222 PORT=8080 gridfill
//! ```

mod middleware;
mod server;

use std::process;

use anyhow::Context;
use clap::Parser;
use gridfill_server::pipeline::PipelineConfig;
use gridfill_server::service::ServiceConfig;
pub use middleware::MiddlewareConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "gridfill")]
#[command(about = "Spreadsheet cell completion server and worker")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// HTTP middleware configuration (CORS, OpenAPI, timeouts).
    #[clap(flatten)]
    pub middleware: MiddlewareConfig,

    /// External service configuration (NATS, completion backend).
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Worker and consumer group configuration.
    #[clap(flatten)]
    pub pipeline: PipelineConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so clap's `env` lookups see its values.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with `RUST_LOG` filtering, defaulting to `info`.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.service
            .validate()
            .context("invalid service configuration")?;
        self.pipeline
            .validate()
            .context("invalid pipeline configuration")?;
        Ok(())
    }

    /// Logs configuration (no secrets).
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();
        self.middleware.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            nats_url = %self.service.nats.nats_url,
            completion_provider = ?self.service.completion.provider,
            batch_ttl_secs = self.service.batch_ttl_secs,
            "Service configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            consumer_group = %self.pipeline.consumer_group.group_name,
            start_position = ?self.pipeline.consumer_group.start_position,
            max_concurrent_jobs = self.pipeline.max_concurrent_jobs,
            fetch_batch = self.pipeline.fetch_batch,
            record_failures = self.pipeline.record_failures,
            retry_failures = self.pipeline.retry_failures,
            "Pipeline configuration"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [
            cfg!(feature = "otel").then_some("otel"),
            cfg!(feature = "dotenv").then_some("dotenv"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
