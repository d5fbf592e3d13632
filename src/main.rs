//! aadlookup - Azure AD user lookup by mail nickname.
//!
//! Acquires an application token with the client-credentials grant and asks
//! Microsoft Graph whether a user with the configured mail nickname exists.

#![deny(clippy::all)]

mod auth;
mod config;
mod error;
mod graph;
mod pipeline;
mod secret;

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{resolve_config_path, Config, CONFIG_PATH_ENV};
use error::AppError;
use graph::LookupResult;

fn main() -> ExitCode {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only warn if it exists but could not be read
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let config_path = resolve_config_path(env::args().nth(1), env::var(CONFIG_PATH_ENV).ok());

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            init_logging("info");
            let err = AppError::from(e);
            error!("Failed to load configuration: {}", err);
            eprintln!("{}", err.user_message());
            eprintln!("\nProvide a config file (see config.example.toml) or set:");
            eprintln!("  AZURE_CLIENT_ID, AZURE_TENANT_ID, AZURE_CLIENT_SECRET, AZURE_MAIL_NICKNAME");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging.level);

    info!("Starting aadlookup v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from '{}'", config_path.display());
    config.log_summary();

    match execute(&config) {
        Ok(result) => {
            for line in result.report_lines() {
                println!("{}", line);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<AppError>() {
                Some(app_err) => {
                    error!("{} failed: {}", app_err.stage(), app_err);
                    eprintln!("{}", app_err.user_message());
                }
                None => {
                    error!("{:#}", e);
                    eprintln!("Error: {:#}", e);
                }
            }
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing/logging. `RUST_LOG` has already been folded into `level`.
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

/// Drive the pipeline on a single-threaded runtime; the two network calls run back to back.
fn execute(config: &Config) -> Result<LookupResult> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let result = runtime.block_on(pipeline::run(config))?;
    Ok(result)
}
