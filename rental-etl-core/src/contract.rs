//! # contract: Universal interface for document sinks
//!
//! This module defines a single trait ([`DocumentSink`]) and its supporting types for
//! writing listing documents into a named collection of a document store, whether that is
//! a real database, the in-process [`crate::memory_sink::MemorySink`], or a test mock.
//!
//! ## Interface & Extensibility
//! - Implement [`DocumentSink`] to load into a new kind of store.
//! - All methods are async and return [`SinkError`].
//! - Collections are addressed by name so the load protocol can stage into a scratch
//!   collection and promote it over the live one.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so consumers can generate deterministic mocks for
//!   unit/integration tests (`MockDocumentSink`).
//!
//! ## Adding New Sinks
//! - `insert_documents` must not fail the whole batch on duplicate keys: report those as
//!   [`InsertFailure`]s and keep inserting the rest.
//! - `drop_collection` on a collection that does not exist is a success.
//! - `rename_collection` replaces the target if it exists.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::document::ListingDocument;
use crate::error::SinkError;

/// A document the sink refused to store, identified by its key when it had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertFailure {
    pub id: Option<i64>,
    pub reason: String,
}

/// Result of a bulk insert: what went in and what was refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    pub failures: Vec<InsertFailure>,
}

/// Trait for stores that hold listing documents in named collections.
/// The implementor is responsible for connecting to the backing store.
///
/// The trait is `Send` + `Sync` and intended for async/await usage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Cheap reachability check that does not need authentication.
    async fn ping(&self) -> Result<(), SinkError>;

    /// Names of all collections in the sink's database.
    async fn list_collections(&self) -> Result<Vec<String>, SinkError>;

    /// Number of documents in `collection` (0 if it does not exist).
    async fn count_documents(&self, collection: &str) -> Result<u64, SinkError>;

    /// Removes `collection` and everything in it.
    async fn drop_collection(&self, collection: &str) -> Result<(), SinkError>;

    /// Inserts `documents` keyed by their id, continuing past per-document failures.
    async fn insert_documents(
        &self,
        collection: &str,
        documents: &[ListingDocument],
    ) -> Result<InsertOutcome, SinkError>;

    /// Atomically renames `from` to `to`, replacing `to` if it exists.
    async fn rename_collection(&self, from: &str, to: &str) -> Result<(), SinkError>;
}
