//! Storage backend abstraction.
//!
//! Records never talk to a database driver directly. They build a [`Query`] against a named
//! collection and hand it, together with the document payload, to a [`StoreBackend`]. Write
//! operations answer with a [`WriteResult`] describing what the store did; the record engine
//! interprets those counts to detect partial failures.
//!
//! # Examples
//!
//! ```ignore
//! use recordlayer::backend::StoreBackend;
//! use recordlayer::query::Query;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! let result = backend.insert("users", doc! { "name": "Alice" }).await?;
//! assert_eq!(result.inserted, 1);
//!
//! let rows = backend.execute("users", &Query::new()).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

use crate::{error::RecordResult, query::Query};

/// The outcome a store reports for a write operation.
///
/// Mirrors the summary document returned by document databases: how many rows were inserted,
/// replaced, left unchanged or deleted, how many errors occurred, and which keys the store
/// generated for inserted rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteResult {
    pub inserted: u64,
    #[serde(alias = "updated")]
    pub replaced: u64,
    pub unchanged: u64,
    pub deleted: u64,
    pub errors: u64,
    pub generated_keys: Vec<Bson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_error: Option<String>,
}

impl WriteResult {
    /// A result describing a single inserted row with a store-generated key.
    pub fn inserted(key: Bson) -> Self {
        Self {
            inserted: 1,
            generated_keys: vec![key],
            ..Self::default()
        }
    }

    /// A result describing a single failed write.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            errors: 1,
            first_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Records an error, keeping the first message seen.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        if self.first_error.is_none() {
            self.first_error = Some(message.into());
        }
    }

    /// Number of rows an update actually rewrote.
    pub fn updated(&self) -> u64 {
        self.replaced
    }
}

impl fmt::Display for WriteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{inserted: {}, replaced: {}, unchanged: {}, deleted: {}, errors: {}",
            self.inserted, self.replaced, self.unchanged, self.deleted, self.errors
        )?;
        if let Some(first_error) = &self.first_error {
            write!(f, ", first_error: {first_error:?}")?;
        }
        f.write_str("}")
    }
}

/// Abstract interface for document storage backends.
///
/// Every method issues exactly one request against the store and resolves once the store has
/// answered. Implementations are responsible for their own concurrency control; the record
/// engine never retries and has no timeout policy of its own.
///
/// # Identifiers
///
/// Rows carry their primary key under `id`. When an inserted document has no `id`, the backend
/// generates one and reports it in [`WriteResult::generated_keys`].
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts one document into a collection.
    ///
    /// Per-row failures (such as a duplicate primary key) are reported through
    /// [`WriteResult::errors`]; transport failures are returned as errors.
    async fn insert(&self, collection: &str, document: Document) -> RecordResult<WriteResult>;

    /// Merges `changes` into every row matched by `query`.
    ///
    /// Rows whose content actually changed count as `replaced`, the rest as `unchanged`.
    async fn update(
        &self,
        collection: &str,
        query: &Query,
        changes: Document,
    ) -> RecordResult<WriteResult>;

    /// Deletes every row matched by `query`, honouring its ordering and limit.
    async fn delete(&self, collection: &str, query: &Query) -> RecordResult<WriteResult>;

    /// Runs `query` and returns the matching rows.
    async fn execute(&self, collection: &str, query: &Query) -> RecordResult<Vec<Document>>;

    /// Counts the rows `query` would return.
    async fn count(&self, collection: &str, query: &Query) -> RecordResult<u64>;

    /// Creates an empty collection. Creating an existing collection is not an error.
    async fn create_collection(&self, name: &str) -> RecordResult<()>;

    /// Drops a collection and all of its rows.
    async fn drop_collection(&self, name: &str) -> RecordResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> RecordResult<Vec<String>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> RecordResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert(&self, collection: &str, document: Document) -> RecordResult<WriteResult> {
        (*self).insert(collection, document).await
    }

    async fn update(
        &self,
        collection: &str,
        query: &Query,
        changes: Document,
    ) -> RecordResult<WriteResult> {
        (*self).update(collection, query, changes).await
    }

    async fn delete(&self, collection: &str, query: &Query) -> RecordResult<WriteResult> {
        (*self).delete(collection, query).await
    }

    async fn execute(&self, collection: &str, query: &Query) -> RecordResult<Vec<Document>> {
        (*self).execute(collection, query).await
    }

    async fn count(&self, collection: &str, query: &Query) -> RecordResult<u64> {
        (*self).count(collection, query).await
    }

    async fn create_collection(&self, name: &str) -> RecordResult<()> {
        (*self).create_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> RecordResult<()> {
        (*self).drop_collection(name).await
    }

    async fn list_collections(&self) -> RecordResult<Vec<String>> {
        (*self).list_collections().await
    }
}

/// Factory trait for creating configured backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> RecordResult<Self::Backend>;
}
