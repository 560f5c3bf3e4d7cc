/// `load_config` module: Loads a static YAML config file into the CLI config and the core
/// [`PipelineConfig`].
///
/// This module is the only place where untrusted YAML is parsed and mapped to strongly-typed
/// structs.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file (`clean` and `load` sections)
/// - Fill in defaults for everything the `load` section may omit
/// - Surface clear diagnostics: any failure in loading is a fatal, readable error
///
/// Store credentials never live in the file. They are read from the environment by
/// [`crate::mongo::MongoSettings::from_env`] when a Mongo sink is requested.
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use rental_etl_core::config::{CleanConfig, PipelineConfig};
use rental_etl_core::load::LoadConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_DATABASE: &str = "rental_db";

/// Which store the load stage writes into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Mongo,
    /// In-process store, discarded on exit. Useful as a dry run.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoadSection {
    #[serde(default)]
    pub sink: SinkKind,
    #[serde(default = "default_database")]
    pub database: String,
    /// Bounds server selection and connect; `None` keeps the driver defaults.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(flatten)]
    pub policy: LoadConfig,
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_owned()
}

impl Default for LoadSection {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            database: default_database(),
            timeout_secs: None,
            policy: LoadConfig::default(),
        }
    }
}

impl LoadSection {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
    pub clean: CleanConfig,
    #[serde(default)]
    pub load: LoadSection,
}

impl CliConfig {
    /// The store-independent part, as the core pipeline wants it.
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            clean: self.clean.clone(),
            load: self.load.policy.clone(),
        }
    }
}

/// Loads a static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    info!(
        sink = ?config.load.sink,
        database = %config.load.database,
        timeout_secs = ?config.load.timeout_secs,
        "Load target configured"
    );
    config.pipeline().trace_loaded();
    Ok(config)
}
