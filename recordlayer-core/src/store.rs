//! The store handle records are created from.
//!
//! A [`DocumentStore`] owns a backend connection and hands out [`Record`]s bound to it. It also
//! exposes the collection management operations of the backend.
//!
//! # Example
//!
//! ```ignore
//! use recordlayer::{memory::InMemoryStore, store::DocumentStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! store.create_collection(Article::collection_name()).await?;
//!
//! let mut article = store.record_from::<Article>(doc! { "title": "Hello" })?;
//! article.save().await?;
//! ```

use bson::Document;
use tracing::debug;

use crate::{backend::StoreBackend, error::RecordResult, record::Record, schema::Model};

/// A store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates a blank `M` record with every declared field at its default.
    pub fn record<M: Model>(&self) -> Record<'_, B, M> {
        Record::new(&self.backend)
    }

    /// Creates an `M` record from keyword values.
    ///
    /// `id` sets the identifier, declared fields are validated and coerced, and any other key is
    /// kept as an ad-hoc attribute. The record is dirty if any value differs from its default.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`](crate::error::RecordError::Validation) when a declared
    /// field rejects its value.
    pub fn record_from<M: Model>(&self, kwargs: Document) -> RecordResult<Record<'_, B, M>> {
        Record::from_kwargs(&self.backend, kwargs)
    }

    /// Creates a new collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to create the collection.
    pub async fn create_collection(&self, name: &str) -> RecordResult<()> {
        debug!(collection = name, "creating collection");
        self.backend.create_collection(name).await
    }

    /// Drops a collection and every row in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or deletion fails.
    pub async fn drop_collection(&self, name: &str) -> RecordResult<()> {
        debug!(collection = name, "dropping collection");
        self.backend.drop_collection(name).await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> RecordResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> RecordResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: StoreBackend> From<B> for DocumentStore<B> {
    fn from(backend: B) -> Self {
        Self::new(backend)
    }
}
