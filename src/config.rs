// src/config.rs

//! Manages server configuration: loading, resolving dynamic values, and validation.

use crate::core::provider::LocationSource;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// Timing of the client liveness protocol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HeartbeatConfig {
    /// How long a single read waits for a control byte before re-checking liveness.
    #[serde(default = "default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,
    /// A client that has not sent a heartbeat for longer than this is disconnected.
    #[serde(default = "default_heartbeat_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// A heartbeat triggers a resend of the current state if the last frame sent
    /// to that client is older than this.
    #[serde(default = "default_response_interval", with = "humantime_serde")]
    pub response_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            read_timeout: default_read_timeout(),
            timeout: default_heartbeat_timeout(),
            response_interval: default_response_interval(),
        }
    }
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(1000)
}
fn default_heartbeat_timeout() -> Duration {
    Duration::from_millis(3000)
}
fn default_response_interval() -> Duration {
    Duration::from_millis(1000)
}

/// Settings for the built-in simulated location provider.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Time between generated fixes.
    #[serde(default = "default_sim_interval", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default = "default_sim_latitude")]
    pub latitude: f64,
    #[serde(default = "default_sim_longitude")]
    pub longitude: f64,
    #[serde(default = "default_sim_altitude")]
    pub altitude: f64,
    /// The satellite count the simulation hovers around.
    #[serde(default = "default_sim_satellites")]
    pub satellites: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval: default_sim_interval(),
            latitude: default_sim_latitude(),
            longitude: default_sim_longitude(),
            altitude: default_sim_altitude(),
            satellites: default_sim_satellites(),
        }
    }
}

fn default_sim_interval() -> Duration {
    Duration::from_secs(1)
}
fn default_sim_latitude() -> f64 {
    52.2297
}
fn default_sim_longitude() -> f64 {
    21.0122
}
fn default_sim_altitude() -> f64 {
    100.0
}
fn default_sim_satellites() -> u32 {
    9
}

/// The location source may be given by name or by the legacy numeric selector.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
enum SourceConfig {
    Selector(u8),
    Name(LocationSource),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Name(LocationSource::default())
    }
}

/// A raw representation of the config file before validation and resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    source: SourceConfig,
    #[serde(default = "default_provider_stop_grace", with = "humantime_serde")]
    provider_stop_grace: Duration,
    #[serde(default)]
    heartbeat: HeartbeatConfig,
    #[serde(default)]
    simulator: SimulatorConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8887
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_provider_stop_grace() -> Duration {
    Duration::from_secs(15)
}

/// Represents the final, validated, and resolved server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub source: LocationSource,
    /// How long the provider keeps running after the last client disconnects.
    #[serde(with = "humantime_serde")]
    pub provider_stop_grace: Duration,
    pub heartbeat: HeartbeatConfig,
    pub simulator: SimulatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            source: LocationSource::default(),
            provider_stop_grace: default_provider_stop_grace(),
            heartbeat: HeartbeatConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config file '{path}'"))
    }

    /// Parses, resolves and validates configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;

        let source = match raw_config.source {
            SourceConfig::Name(source) => source,
            SourceConfig::Selector(selector) => LocationSource::from_selector(selector),
        };

        let config = Config {
            host: raw_config.host,
            port: raw_config.port,
            log_level: raw_config.log_level,
            source,
            provider_stop_grace: raw_config.provider_stop_grace,
            heartbeat: raw_config.heartbeat,
            simulator: raw_config.simulator,
        };

        config.validate()?;
        Ok(config)
    }

    /// The `host:port` string the listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates the resolved configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.heartbeat.read_timeout.is_zero() {
            return Err(anyhow!("heartbeat.read_timeout cannot be 0"));
        }
        if self.heartbeat.timeout.is_zero() {
            return Err(anyhow!("heartbeat.timeout cannot be 0"));
        }
        if self.heartbeat.timeout < self.heartbeat.read_timeout {
            warn!(
                "heartbeat.timeout ({:?}) is shorter than heartbeat.read_timeout ({:?}); timeouts will be detected late.",
                self.heartbeat.timeout, self.heartbeat.read_timeout
            );
        }
        if self.simulator.interval.is_zero() {
            return Err(anyhow!("simulator.interval cannot be 0"));
        }
        if !(-90.0..=90.0).contains(&self.simulator.latitude) {
            return Err(anyhow!(
                "simulator.latitude must be between -90 and 90, got {}",
                self.simulator.latitude
            ));
        }
        if !(-180.0..=180.0).contains(&self.simulator.longitude) {
            return Err(anyhow!(
                "simulator.longitude must be between -180 and 180, got {}",
                self.simulator.longitude
            ));
        }
        Ok(())
    }
}
