//! # MongoDB sink
//!
//! Production [`DocumentSink`] over a MongoDB database.
//!
//! - Construct the connection settings with [`MongoSettings::from_env`] (`MONGO_USER`,
//!   `MONGO_PASS`, optional `MONGO_HOST`/`MONGO_PORT`) and connect with [`MongoSink::connect`].
//! - The driver connects lazily, so an unreachable server first shows up at [`DocumentSink::ping`],
//!   which sends the unauthenticated `hello` handshake to `admin`.
//! - Dates are stored as native BSON dates rather than strings.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::{ClientOptions, Credential, InsertManyOptions};
use mongodb::{Client, Collection, Database};

use rental_etl_core::contract::{DocumentSink, InsertFailure, InsertOutcome};
use rental_etl_core::document::ListingDocument;
use rental_etl_core::error::SinkError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 27017;
const APP_NAME: &str = "rental-etl";
const NAMESPACE_NOT_FOUND: i32 = 26;

/// Connection settings for [`MongoSink`]. The password is never logged.
#[derive(Clone)]
pub struct MongoSettings {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl std::fmt::Debug for MongoSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoSettings")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl MongoSettings {
    pub fn from_env() -> Result<Self> {
        match (env::var("MONGO_USER"), env::var("MONGO_PASS")) {
            (Ok(user), Ok(password)) => {
                let host = env::var("MONGO_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned());
                let port = match env::var("MONGO_PORT") {
                    Ok(raw) => raw.parse::<u16>().map_err(|e| {
                        tracing::error!(error = ?e, raw = %raw, "Failed to parse MONGO_PORT from env");
                        anyhow::anyhow!("MONGO_PORT {raw:?} is not a valid port: {e}")
                    })?,
                    Err(_) => DEFAULT_PORT,
                };
                tracing::info!(user = %user, host = %host, port, "Read MongoDB settings from environment");
                Ok(Self {
                    user,
                    password,
                    host,
                    port,
                })
            }
            (Err(e), _) => {
                tracing::error!(error = ?e, "MONGO_USER missing in environment");
                Err(anyhow::anyhow!("MONGO_USER must be set to load into MongoDB: {e}"))
            }
            (_, Err(e)) => {
                tracing::error!(error = ?e, "MONGO_PASS missing in environment");
                Err(anyhow::anyhow!("MONGO_PASS must be set to load into MongoDB: {e}"))
            }
        }
    }

    fn uri(&self) -> String {
        format!("mongodb://{}:{}/", self.host, self.port)
    }
}

pub struct MongoSink {
    client: Client,
    database: Database,
}

impl MongoSink {
    /// Builds the client. No network traffic happens until the first operation.
    pub async fn connect(
        settings: &MongoSettings,
        database: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut options = ClientOptions::parse(settings.uri())
            .await
            .with_context(|| format!("Invalid MongoDB address {}", settings.uri()))?;

        let mut credential = Credential::default();
        credential.username = Some(settings.user.clone());
        credential.password = Some(settings.password.clone());
        options.credential = Some(credential);
        options.app_name = Some(APP_NAME.to_owned());
        if let Some(timeout) = timeout {
            options.server_selection_timeout = Some(timeout);
            options.connect_timeout = Some(timeout);
        }

        let client = Client::with_options(options).context("Failed to construct MongoDB client")?;
        tracing::info!(
            host = %settings.host,
            port = settings.port,
            database,
            timeout = ?timeout,
            "MongoDB client initialised"
        );
        Ok(Self {
            database: client.database(database),
            client,
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }

    fn namespace(&self, collection: &str) -> String {
        format!("{}.{}", self.database.name(), collection)
    }
}

fn is_connectivity(e: &MongoError) -> bool {
    matches!(*e.kind, ErrorKind::ServerSelection { .. } | ErrorKind::Io(_))
}

fn sink_error(operation: &'static str, e: MongoError) -> SinkError {
    if is_connectivity(&e) {
        SinkError::Connectivity(e.to_string())
    } else {
        SinkError::Operation {
            operation,
            message: e.to_string(),
        }
    }
}

fn bson_date(value: Option<DateTime<Utc>>) -> Bson {
    value.map_or(Bson::Null, |ts| {
        Bson::DateTime(bson::DateTime::from_millis(ts.timestamp_millis()))
    })
}

/// Replaces the value at a dotted path; missing parents leave the document as is.
fn set_path(doc: &mut Document, path: &[&str], value: Bson) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut target = doc;
    for key in parents {
        target = match target.get_document_mut(key) {
            Ok(inner) => inner,
            Err(_) => return,
        };
    }
    target.insert(*last, value);
}

/// Serialises a listing document for storage, with timestamps as BSON dates.
pub fn to_bson_document(listing: &ListingDocument) -> Result<Document, SinkError> {
    let mut doc = bson::to_document(listing).map_err(|e| SinkError::Operation {
        operation: "serialize",
        message: e.to_string(),
    })?;
    set_path(&mut doc, &["scraped_at"], bson_date(listing.scraped_at));
    set_path(&mut doc, &["host", "since"], bson_date(listing.host.since));
    set_path(
        &mut doc,
        &["reviews", "first_review"],
        bson_date(listing.reviews.first_review),
    );
    set_path(
        &mut doc,
        &["reviews", "last_review"],
        bson_date(listing.reviews.last_review),
    );
    Ok(doc)
}

#[async_trait]
impl DocumentSink for MongoSink {
    async fn ping(&self) -> Result<(), SinkError> {
        self.client
            .database("admin")
            .run_command(doc! { "hello": 1 }, None)
            .await
            .map(|_| ())
            .map_err(|e| {
                tracing::error!(error = %e, "MongoDB hello handshake failed");
                SinkError::Connectivity(e.to_string())
            })
    }

    async fn list_collections(&self) -> Result<Vec<String>, SinkError> {
        self.database
            .list_collection_names(None)
            .await
            .map_err(|e| sink_error("list_collections", e))
    }

    async fn count_documents(&self, collection: &str) -> Result<u64, SinkError> {
        self.collection(collection)
            .count_documents(None, None)
            .await
            .map_err(|e| sink_error("count_documents", e))
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), SinkError> {
        self.collection(collection)
            .drop(None)
            .await
            .map_err(|e| sink_error("drop_collection", e))
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: &[ListingDocument],
    ) -> Result<InsertOutcome, SinkError> {
        if documents.is_empty() {
            return Ok(InsertOutcome::default());
        }
        let docs = documents
            .iter()
            .map(to_bson_document)
            .collect::<Result<Vec<_>, _>>()?;
        let options = InsertManyOptions::builder().ordered(false).build();

        match self.collection(collection).insert_many(docs, options).await {
            Ok(result) => Ok(InsertOutcome {
                inserted: result.inserted_ids.len(),
                failures: Vec::new(),
            }),
            Err(e) => match *e.kind {
                ErrorKind::BulkWrite(ref failure) if failure.write_concern_error.is_none() => {
                    let failures: Vec<InsertFailure> = failure
                        .write_errors
                        .iter()
                        .flatten()
                        .map(|we| InsertFailure {
                            id: documents.get(we.index).and_then(|d| d.id),
                            reason: format!("E{}: {}", we.code, we.message),
                        })
                        .collect();
                    Ok(InsertOutcome {
                        inserted: documents.len().saturating_sub(failures.len()),
                        failures,
                    })
                }
                _ => Err(sink_error("insert_documents", e)),
            },
        }
    }

    async fn rename_collection(&self, from: &str, to: &str) -> Result<(), SinkError> {
        let command = doc! {
            "renameCollection": self.namespace(from),
            "to": self.namespace(to),
            "dropTarget": true,
        };
        match self.client.database("admin").run_command(command, None).await {
            Ok(_) => Ok(()),
            Err(e) => match *e.kind {
                ErrorKind::Command(ref c) if c.code == NAMESPACE_NOT_FOUND => {
                    Err(SinkError::MissingCollection(from.to_owned()))
                }
                _ => Err(sink_error("rename_collection", e)),
            },
        }
    }
}
