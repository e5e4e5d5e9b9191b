// src/main.rs

//! The main entry point for the gnss-share server application.

use anyhow::{Result, anyhow};
use gnss_share::config::Config;
use gnss_share::core::provider::{LocationSource, SimulatedProvider};
use gnss_share::core::status::LogStatusListener;
use gnss_share::server;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("gnss-share version {VERSION}");
        return Ok(());
    }

    let mut config = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = apply_overrides(&args, &mut config) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    // RUST_LOG takes precedence over the configured level.
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true),
        )
        .init();

    info!("Using simulated location provider.");
    let provider = Arc::new(SimulatedProvider::new(config.simulator.clone()));

    if let Err(e) = server::run(config, provider, Arc::new(LogStatusListener)).await {
        error!("Server runtime error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Loads the file given with `--config`, or `config.toml` if present.
/// Without either, the built-in defaults are used.
fn load_config(args: &[String]) -> Result<Config> {
    match flag_value(args, "--config")? {
        Some(path) => Config::from_file(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::from_file(DEFAULT_CONFIG_PATH),
        None => Ok(Config::default()),
    }
}

fn apply_overrides(args: &[String], config: &mut Config) -> Result<()> {
    if let Some(port) = flag_value(args, "--port")? {
        config.port = port
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid port number: {port}"))?;
    }

    if let Some(source) = flag_value(args, "--source")? {
        config.source = match source.parse::<u8>() {
            Ok(selector) => LocationSource::from_selector(selector),
            Err(_) => source
                .parse::<LocationSource>()
                .map_err(|_| anyhow!("Invalid location source: {source}"))?,
        };
    }

    config.validate()
}

/// Returns the value following `flag`, if the flag is present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match args.iter().position(|arg| arg == flag) {
        Some(i) => args
            .get(i + 1)
            .map(|s| Some(s.as_str()))
            .ok_or_else(|| anyhow!("{flag} flag requires a value")),
        None => Ok(None),
    }
}
