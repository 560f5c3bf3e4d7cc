//! High-level pipeline: orchestrates clean → persist → map → load.
//!
//! The pipeline runs in two stages that share the canonical CSV as their hand-off:
//!   - [`clean_stage`]: reads the raw export, cleans it, and overwrites the canonical file
//!   - [`load_stage`]: re-reads the canonical file, maps records to documents, and replaces the
//!     destination collection through [`crate::load::load`]
//!
//! [`run`] performs both in order. Each stage is fail-fast on run-level errors (missing input,
//! unreadable CSV, connectivity, load failure); per-record rejections only show up in the
//! [`CleanReport`].
//!
//! # Callable From
//! - Used by the CLI crate and integration tests
//! - Expects a concrete [`DocumentSink`] implementation for the load stage

use std::path::Path;

use tracing::{error, info};

use crate::clean::{clean_records, CleanReport};
use crate::config::PipelineConfig;
use crate::contract::DocumentSink;
use crate::document::to_documents;
use crate::error::PipelineError;
use crate::load::{load, LoadConfig, LoadReport};
use crate::tabular;

/// Reports of both stages of a full run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub clean: CleanReport,
    pub load: LoadReport,
}

/// Raw export → canonical file.
pub fn clean_stage(raw_path: &Path, canonical_path: &Path) -> Result<CleanReport, PipelineError> {
    info!(raw_path = %raw_path.display(), "[CLEAN] Starting clean stage");
    let raw = tabular::read_raw_records(raw_path)?;
    let output = clean_records(raw);
    tabular::write_canonical(canonical_path, &output.records)?;
    info!(
        canonical_path = %canonical_path.display(),
        cleaned = output.report.cleaned,
        rejected = output.report.rejected.len(),
        "[CLEAN] Clean stage complete"
    );
    Ok(output.report)
}

/// Canonical file → documents → sink.
pub async fn load_stage<S>(
    canonical_path: &Path,
    sink: &S,
    config: &LoadConfig,
) -> Result<LoadReport, PipelineError>
where
    S: DocumentSink + ?Sized,
{
    info!(canonical_path = %canonical_path.display(), "[LOAD] Starting load stage");
    let records = tabular::read_canonical(canonical_path)?;
    let documents = to_documents(&records);
    info!(documents = documents.len(), "[LOAD] Mapped canonical records to documents");
    match load(&documents, sink, config).await {
        Ok(report) => Ok(report),
        Err(e) => {
            error!(error = %e, "[LOAD][ERROR] Load stage failed");
            Err(e.into())
        }
    }
}

/// Both stages, in order.
pub async fn run<S>(config: &PipelineConfig, sink: &S) -> Result<RunReport, PipelineError>
where
    S: DocumentSink + ?Sized,
{
    info!("[RUN] Starting full pipeline run");
    let clean = clean_stage(&config.clean.raw_path, &config.clean.canonical_path)?;
    let load = load_stage(&config.clean.canonical_path, sink, &config.load).await?;
    info!("[RUN] Pipeline run complete");
    Ok(RunReport { clean, load })
}
