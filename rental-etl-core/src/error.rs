//! Error taxonomy for the clean and load stages.
//!
//! Defaultable parse failures never show up here: they are absorbed by the coercers in
//! [`crate::coerce`] and only counted. Everything in this module is either a per-record rejection
//! (collected, never propagated) or a run-level failure that halts the current stage.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single raw record could not be turned into a canonical record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    #[error("price is missing")]
    MissingPrice,
    #[error("price {0:?} is not a number after stripping currency decoration")]
    InvalidPrice(String),
    #[error("price {0} is negative")]
    NegativePrice(f64),
    #[error("flag token {token:?} is neither 't' nor 'f'")]
    UnknownFlag { token: String },
}

/// A raw record excluded from the canonical output, with enough context to find it in the source.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("row {row} (id {id:?}) rejected on field '{field}': {error}")]
pub struct RecordRejection {
    /// 1-based data row number in the raw source (header excluded).
    pub row: usize,
    /// The raw id text, if the record had one.
    pub id: Option<String>,
    pub field: &'static str,
    pub error: CoerceError,
}

/// Failures reported by a [`crate::contract::DocumentSink`] implementation.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The store could not be reached or refused the handshake.
    #[error("store unreachable: {0}")]
    Connectivity(String),
    /// A collection the operation needs does not exist.
    #[error("collection '{0}' does not exist")]
    MissingCollection(String),
    /// The store accepted the connection but the operation failed.
    #[error("store operation '{operation}' failed: {message}")]
    Operation {
        operation: &'static str,
        message: String,
    },
}

/// Fatal failures of the load protocol.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Pre-check failed; the destination was not touched.
    #[error("connectivity pre-check failed, destination untouched: {0}")]
    Connectivity(#[source] SinkError),
    #[error("clearing collection '{collection}' failed: {source}")]
    Clear {
        collection: String,
        #[source]
        source: SinkError,
    },
    #[error("bulk insert into '{collection}' failed: {source}")]
    Insert {
        collection: String,
        #[source]
        source: SinkError,
    },
    #[error("promoting staging collection '{staging}' over '{collection}' failed: {source}")]
    Promote {
        staging: String,
        collection: String,
        #[source]
        source: SinkError,
    },
}

/// Run-level failures of a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input file not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
}
