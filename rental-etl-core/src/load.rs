//! Replace-semantics load of listing documents into a [`DocumentSink`].
//!
//! Every successful run leaves the destination collection holding exactly the documents of
//! that run, never a union with a previous one.
//!
//! # Protocol
//! 1. Probe the sink. On failure nothing is touched and [`LoadError::Connectivity`] is returned.
//! 2. Replace the destination's contents, depending on [`LoadStrategy`]:
//!    - `ClearThenInsert`: drop the live collection, then bulk insert into it. A failed insert
//!      leaves the destination empty (or partially filled); there is no rollback.
//!    - `StageAndSwap`: bulk insert into a fresh staging collection, then rename it over the
//!      live one. The live collection is only touched by the final rename, so readers never see
//!      it empty.
//! 3. Duplicate keys are per-document failures in the report, not errors.
//!
//! An empty input either still clears the destination or leaves it alone, per
//! [`EmptyInputPolicy`].

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::contract::{DocumentSink, InsertFailure};
use crate::document::ListingDocument;
use crate::error::{LoadError, SinkError};

pub const DEFAULT_COLLECTION: &str = "listings";

const STAGING_INFIX: &str = "_staging_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    #[default]
    ClearThenInsert,
    StageAndSwap,
}

/// What to do with the destination when there is nothing to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyInputPolicy {
    /// Clear anyway: the destination mirrors the (empty) run.
    #[default]
    Clear,
    /// Leave the destination as it is.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub strategy: LoadStrategy,
    #[serde(default)]
    pub on_empty_input: EmptyInputPolicy,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_owned()
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            strategy: LoadStrategy::default(),
            on_empty_input: EmptyInputPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub collection: String,
    pub strategy: LoadStrategy,
    pub attempted: usize,
    pub inserted: usize,
    pub failures: Vec<InsertFailure>,
    /// Whether the previous contents of the destination were discarded.
    pub cleared: bool,
}

impl LoadReport {
    fn new(config: &LoadConfig, attempted: usize) -> Self {
        Self {
            collection: config.collection.clone(),
            strategy: config.strategy,
            attempted,
            inserted: 0,
            failures: Vec::new(),
            cleared: false,
        }
    }
}

/// Loads `documents` into `config.collection`, replacing its previous contents.
pub async fn load<S>(
    documents: &[ListingDocument],
    sink: &S,
    config: &LoadConfig,
) -> Result<LoadReport, LoadError>
where
    S: DocumentSink + ?Sized,
{
    info!(
        collection = %config.collection,
        strategy = ?config.strategy,
        documents = documents.len(),
        "[LOAD] Starting load"
    );

    if let Err(e) = sink.ping().await {
        error!(error = %e, "[LOAD][ERROR] Connectivity pre-check failed, destination untouched");
        return Err(LoadError::Connectivity(e));
    }
    info!("[LOAD] Connectivity pre-check succeeded");

    let mut report = LoadReport::new(config, documents.len());

    if documents.is_empty() {
        match config.on_empty_input {
            EmptyInputPolicy::Skip => {
                warn!(collection = %config.collection, "[LOAD] No documents to load, leaving destination as is");
            }
            EmptyInputPolicy::Clear => {
                warn!(collection = %config.collection, "[LOAD] No documents to load, clearing destination");
                clear_collection(sink, &config.collection).await?;
                report.cleared = true;
            }
        }
        return Ok(report);
    }

    if let Some(first) = documents.first() {
        match serde_json::to_string_pretty(first) {
            Ok(json) => debug!(json = %json, "[LOAD][DEBUG] First document as JSON"),
            Err(e) => debug!(error = %e, "[LOAD][DEBUG] Failed to serialize first document as JSON"),
        }
    }

    let outcome = match config.strategy {
        LoadStrategy::ClearThenInsert => {
            clear_collection(sink, &config.collection).await?;
            report.cleared = true;
            info!(collection = %config.collection, "[LOAD] Cleared destination");
            sink.insert_documents(&config.collection, documents)
                .await
                .map_err(|source| {
                    error!(error = %source, "[LOAD][ERROR] Bulk insert failed after clear; destination may be empty");
                    LoadError::Insert {
                        collection: config.collection.clone(),
                        source,
                    }
                })?
        }
        LoadStrategy::StageAndSwap => {
            drop_stale_staging(sink, &config.collection).await;
            let staging = staging_name(&config.collection);
            info!(staging = %staging, "[LOAD] Inserting into staging collection");
            let outcome = match sink.insert_documents(&staging, documents).await {
                Ok(outcome) => outcome,
                Err(source) => {
                    error!(error = %source, staging = %staging, "[LOAD][ERROR] Staging insert failed; destination untouched");
                    if let Err(e) = sink.drop_collection(&staging).await {
                        warn!(error = %e, staging = %staging, "[LOAD] Failed to drop staging collection");
                    }
                    return Err(LoadError::Insert {
                        collection: staging,
                        source,
                    });
                }
            };
            sink.rename_collection(&staging, &config.collection)
                .await
                .map_err(|source| {
                    error!(error = %source, staging = %staging, "[LOAD][ERROR] Promoting staging collection failed");
                    LoadError::Promote {
                        staging: staging.clone(),
                        collection: config.collection.clone(),
                        source,
                    }
                })?;
            report.cleared = true;
            info!(staging = %staging, collection = %config.collection, "[LOAD] Promoted staging collection");
            outcome
        }
    };

    for failure in &outcome.failures {
        warn!(id = ?failure.id, reason = %failure.reason, "[LOAD] Document not inserted");
    }
    report.inserted = outcome.inserted;
    report.failures = outcome.failures;

    info!(
        attempted = report.attempted,
        inserted = report.inserted,
        failed = report.failures.len(),
        "[LOAD] Load complete"
    );
    Ok(report)
}

/// Removes the collection and all its documents.
pub async fn clear_collection<S>(sink: &S, collection: &str) -> Result<(), LoadError>
where
    S: DocumentSink + ?Sized,
{
    sink.drop_collection(collection).await.map_err(|source| {
        error!(error = %source, collection, "[LOAD][ERROR] Failed to clear collection");
        LoadError::Clear {
            collection: collection.to_owned(),
            source,
        }
    })
}

fn staging_name(collection: &str) -> String {
    format!("{collection}{STAGING_INFIX}{}", Uuid::new_v4().simple())
}

fn is_staging_of(name: &str, collection: &str) -> bool {
    name.strip_prefix(collection)
        .and_then(|rest| rest.strip_prefix(STAGING_INFIX))
        .is_some_and(|suffix| !suffix.is_empty())
}

/// Drops staging collections left behind by earlier interrupted runs. Best effort.
async fn drop_stale_staging<S>(sink: &S, collection: &str)
where
    S: DocumentSink + ?Sized,
{
    let names = match sink.list_collections().await {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "[LOAD] Could not list collections to clean up stale staging");
            return;
        }
    };
    let stale: Vec<String> = names
        .into_iter()
        .filter(|name| is_staging_of(name, collection))
        .collect();
    if stale.is_empty() {
        return;
    }
    info!(count = stale.len(), "[LOAD] Dropping stale staging collections");
    let results: Vec<Result<(), SinkError>> =
        join_all(stale.iter().map(|name| sink.drop_collection(name))).await;
    for (name, result) in stale.iter().zip(results) {
        if let Err(e) = result {
            warn!(error = %e, staging = %name, "[LOAD] Failed to drop stale staging collection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_names_are_recognised() {
        let name = staging_name("listings");
        assert!(is_staging_of(&name, "listings"));
        assert!(!is_staging_of("listings", "listings"));
        assert!(!is_staging_of("listings_staging_", "listings"));
        assert!(!is_staging_of("reviews_staging_abc", "listings"));
    }
}
