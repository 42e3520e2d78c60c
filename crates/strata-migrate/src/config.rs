//! Configuration for the strata CLI.

use serde::Deserialize;

use strata_graph::ServerConfig;

use crate::error::{MigrateError, Result};

/// Top-level strata configuration.
///
/// Loaded from `strata.{toml,yaml,json}`, then `STRATA_` environment
/// variables (`__` separates sections), then command-line overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrataConfig {
    /// OrientDB server connection.
    #[serde(default)]
    pub server: ServerConfig,

    /// Concurrency caps for batch operations.
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// External migration runner.
    #[serde(default)]
    pub migrate: RunnerConfig,
}

/// In-flight request caps. Documents themselves are always declared one at
/// a time.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    /// Deferred stages (links, properties, edges, indexes) run across documents.
    #[serde(default = "default_deferred")]
    pub deferred: usize,

    /// Creations within one reconciler call.
    #[serde(default = "default_objects")]
    pub objects: usize,

    /// Per-class property batches within one reconciler call.
    #[serde(default = "default_properties")]
    pub properties: usize,

    /// Database drops.
    #[serde(default = "default_drops")]
    pub drops: usize,
}

/// The versioned-file migration tool invoked by `strata migrate`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Program name or path (default: "migrate").
    #[serde(default = "default_program")]
    pub program: String,

    /// Template passed to `create` when none is given.
    #[serde(default)]
    pub template_file: Option<String>,
}

/// Server settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_deferred() -> usize {
    4
}

fn default_objects() -> usize {
    4
}

fn default_properties() -> usize {
    8
}

fn default_drops() -> usize {
    4
}

fn default_program() -> String {
    "migrate".to_string()
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            deferred: default_deferred(),
            objects: default_objects(),
            properties: default_properties(),
            drops: default_drops(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            template_file: None,
        }
    }
}

/// Load configuration from file and environment, apply overrides, and check
/// that the server settings are usable.
pub fn load_config(file_prefix: &str, overrides: &ServerOverrides) -> Result<StrataConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("STRATA")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("server.host", overrides.host.clone())
        .and_then(|b| b.set_override_option("server.port", overrides.port.map(i64::from)))
        .and_then(|b| b.set_override_option("server.username", overrides.username.clone()))
        .and_then(|b| b.set_override_option("server.password", overrides.password.clone()))
        .and_then(|b| b.build())
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let config: StrataConfig = cfg
        .try_deserialize()
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    config.check()?;
    Ok(config)
}

impl StrataConfig {
    fn check(&self) -> Result<()> {
        let server = &self.server;
        if server.password.is_empty() {
            return Err(MigrateError::Config("password is required".into()));
        }
        if server.username.is_empty() {
            return Err(MigrateError::Config("username is required".into()));
        }
        if server.host.is_empty() {
            return Err(MigrateError::Config("host is required".into()));
        }
        if server.port == 0 {
            return Err(MigrateError::Config("port is required".into()));
        }
        Ok(())
    }
}
