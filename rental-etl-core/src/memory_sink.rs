//! In-process [`DocumentSink`] with primary-key semantics. Used for dry runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::contract::{DocumentSink, InsertFailure, InsertOutcome};
use crate::document::ListingDocument;
use crate::error::SinkError;

/// Primary key of a stored document: its own id, or one the sink assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Key {
    Given(i64),
    Assigned(u64),
}

type Collections = BTreeMap<String, BTreeMap<Key, ListingDocument>>;

#[derive(Debug)]
pub struct MemorySink {
    collections: Mutex<Collections>,
    reachable: AtomicBool,
    next_key: AtomicU64,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self {
            collections: Mutex::new(BTreeMap::new()),
            reachable: AtomicBool::new(true),
            next_key: AtomicU64::new(0),
        }
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `collection` with `documents`, replacing whatever it held.
    pub fn with_collection(self, collection: &str, documents: Vec<ListingDocument>) -> Self {
        if let Ok(mut guard) = self.collections.lock() {
            guard.insert(
                collection.to_owned(),
                documents
                    .into_iter()
                    .map(|d| (self.key_for(&d), d))
                    .collect(),
            );
        }
        self
    }

    /// Simulates the store going away (or coming back).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Snapshot of `collection`, ordered by id. Documents without an id come last, in insert
    /// order.
    pub fn documents(&self, collection: &str) -> Vec<ListingDocument> {
        self.collections
            .lock()
            .map(|guard| {
                guard
                    .get(collection)
                    .map(|docs| docs.values().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn key_for(&self, doc: &ListingDocument) -> Key {
        match doc.id {
            Some(id) => Key::Given(id),
            None => Key::Assigned(self.next_key.fetch_add(1, Ordering::SeqCst)),
        }
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, Collections>, SinkError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(SinkError::Connectivity("memory sink marked unreachable".into()));
        }
        self.collections.lock().map_err(|e| SinkError::Operation {
            operation,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DocumentSink for MemorySink {
    async fn ping(&self) -> Result<(), SinkError> {
        self.lock("ping").map(|_| ())
    }

    async fn list_collections(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.lock("list_collections")?.keys().cloned().collect())
    }

    async fn count_documents(&self, collection: &str) -> Result<u64, SinkError> {
        let guard = self.lock("count_documents")?;
        Ok(guard.get(collection).map_or(0, |docs| docs.len() as u64))
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), SinkError> {
        self.lock("drop_collection")?.remove(collection);
        Ok(())
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: &[ListingDocument],
    ) -> Result<InsertOutcome, SinkError> {
        let mut guard = self.lock("insert_documents")?;
        let target = guard.entry(collection.to_owned()).or_default();
        let mut outcome = InsertOutcome::default();
        for doc in documents {
            let key = self.key_for(doc);
            match key {
                Key::Given(id) if target.contains_key(&key) => outcome.failures.push(InsertFailure {
                    id: Some(id),
                    reason: format!("duplicate key: _id {id}"),
                }),
                _ => {
                    target.insert(key, doc.clone());
                    outcome.inserted += 1;
                }
            }
        }
        Ok(outcome)
    }

    async fn rename_collection(&self, from: &str, to: &str) -> Result<(), SinkError> {
        let mut guard = self.lock("rename_collection")?;
        let docs = guard
            .remove(from)
            .ok_or_else(|| SinkError::MissingCollection(from.to_owned()))?;
        guard.insert(to.to_owned(), docs);
        Ok(())
    }
}
