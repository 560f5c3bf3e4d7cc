use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::load::LoadConfig;

/// Where the clean stage reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanConfig {
    pub raw_path: PathBuf,
    pub canonical_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub clean: CleanConfig,
    #[serde(default)]
    pub load: LoadConfig,
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            raw_path = %self.clean.raw_path.display(),
            canonical_path = %self.clean.canonical_path.display(),
            collection = %self.load.collection,
            strategy = ?self.load.strategy,
            on_empty_input = ?self.load.on_empty_input,
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}
