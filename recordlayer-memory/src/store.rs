//! In-memory storage implementation for record stores.
//!
//! Rows are kept as BSON documents per collection, in insertion order, behind an async-aware
//! read-write lock. Write results follow the document-database convention: per-row failures such
//! as a duplicate primary key are counted in [`WriteResult::errors`] rather than returned as
//! errors.

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;
use uuid::Uuid;

use recordlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder, WriteResult},
    error::{RecordError, RecordResult},
    query::Query,
    record::ID_KEY,
};

use crate::evaluator::{DocumentEvaluator, compare_rows};

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory record storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so clones share the
/// same rows.
///
/// Inserted rows without an `id` receive a random UUID string, reported back through
/// [`WriteResult::generated_keys`].
///
/// # Performance
///
/// Queries scan every row of a collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use recordlayer_memory::InMemoryStore;
/// use recordlayer::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let result = store.insert("users", doc! { "name": "Alice" }).await?;
/// assert_eq!(result.generated_keys.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> rows
    store: Arc<RwLock<StoreMap>>,
    /// Reject operations on collections that were never created.
    strict: bool,
}

impl InMemoryStore {
    /// Creates a new empty store that creates collections on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    fn rows_mut<'s>(&self, store: &'s mut StoreMap, name: &str) -> RecordResult<&'s mut Vec<Document>> {
        if self.strict {
            store
                .get_mut(name)
                .ok_or_else(|| RecordError::CollectionNotFound(name.to_string()))
        } else {
            Ok(store.entry(name.to_string()).or_default())
        }
    }

    fn rows<'s>(&self, store: &'s StoreMap, name: &str) -> RecordResult<&'s [Document]> {
        match store.get(name) {
            Some(rows) => Ok(rows),
            None if self.strict => Err(RecordError::CollectionNotFound(name.to_string())),
            None => Ok(&[][..]),
        }
    }
}

/// Returns the positions of the rows selected by `query`, in result order.
fn select(rows: &[Document], query: &Query) -> Vec<usize> {
    let mut selected = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| match &query.filter {
            Some(filter) => DocumentEvaluator::matches(row, filter),
            None => true,
        })
        .map(|(index, _)| index)
        .collect::<Vec<_>>();

    if !query.sort.is_empty() {
        selected.sort_by(|a, b| compare_rows(&rows[*a], &rows[*b], &query.sort));
    }

    if let Some(limit) = query.limit {
        selected.truncate(limit);
    }

    selected
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert(&self, collection: &str, mut document: Document) -> RecordResult<WriteResult> {
        let mut store = self.store.write().await;
        let rows = self.rows_mut(&mut store, collection)?;

        let (id, generated) = match document.get(ID_KEY) {
            Some(id) if *id != Bson::Null => (id.clone(), false),
            _ => {
                let key = Bson::String(Uuid::new_v4().to_string());
                document.insert(ID_KEY, key.clone());
                (key, true)
            }
        };

        if rows.iter().any(|row| row.get(ID_KEY) == Some(&id)) {
            debug!(collection, %id, "rejected duplicate primary key");
            return Ok(WriteResult::failed(format!(
                "Duplicate primary key `{ID_KEY}`: {id}"
            )));
        }

        rows.push(document);

        Ok(if generated {
            WriteResult::inserted(id)
        } else {
            WriteResult {
                inserted: 1,
                ..WriteResult::default()
            }
        })
    }

    async fn update(
        &self,
        collection: &str,
        query: &Query,
        changes: Document,
    ) -> RecordResult<WriteResult> {
        let mut store = self.store.write().await;
        let rows = self.rows_mut(&mut store, collection)?;
        let mut result = WriteResult::default();

        for index in select(rows, query) {
            let row = &mut rows[index];

            if let Some(id) = changes.get(ID_KEY)
                && row.get(ID_KEY) != Some(id)
            {
                result.push_error(format!("Primary key `{ID_KEY}` cannot be changed"));
                continue;
            }

            let mut merged = row.clone();
            for (key, value) in &changes {
                merged.insert(key.clone(), value.clone());
            }

            if merged == *row {
                result.unchanged += 1;
            } else {
                *row = merged;
                result.replaced += 1;
            }
        }

        Ok(result)
    }

    async fn delete(&self, collection: &str, query: &Query) -> RecordResult<WriteResult> {
        let mut store = self.store.write().await;
        let rows = self.rows_mut(&mut store, collection)?;

        let mut doomed = vec![false; rows.len()];
        for index in select(rows, query) {
            doomed[index] = true;
        }

        let mut position = 0;
        rows.retain(|_| {
            let keep = !doomed[position];
            position += 1;
            keep
        });

        Ok(WriteResult {
            deleted: doomed.iter().filter(|gone| **gone).count() as u64,
            ..WriteResult::default()
        })
    }

    async fn execute(&self, collection: &str, query: &Query) -> RecordResult<Vec<Document>> {
        let store = self.store.read().await;
        let rows = self.rows(&store, collection)?;

        Ok(select(rows, query)
            .into_iter()
            .map(|index| rows[index].clone())
            .collect())
    }

    async fn count(&self, collection: &str, query: &Query) -> RecordResult<u64> {
        let store = self.store.read().await;
        let rows = self.rows(&store, collection)?;

        Ok(select(rows, query).len() as u64)
    }

    async fn create_collection(&self, name: &str) -> RecordResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> RecordResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(RecordError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> RecordResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use recordlayer_memory::InMemoryStore;
/// use recordlayer::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder()
///     .with_collection("users")
///     .strict(true)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder {
    collections: Vec<String>,
    strict: bool,
}

impl InMemoryStoreBuilder {
    /// Pre-creates an empty collection.
    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.collections.push(name.into());
        self
    }

    /// When enabled, operations on collections that do not exist fail with
    /// [`RecordError::CollectionNotFound`] instead of creating them on demand.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> RecordResult<Self::Backend> {
        let store = self
            .collections
            .into_iter()
            .map(|name| (name, Vec::new()))
            .collect::<StoreMap>();

        Ok(InMemoryStore {
            store: Arc::new(RwLock::new(store)),
            strict: self.strict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use recordlayer_core::query::Filter;

    fn by_id(id: &Bson) -> Query {
        Query::builder().filter(Filter::eq(ID_KEY, id.clone())).build()
    }

    #[tokio::test]
    async fn insert_generates_keys_and_rejects_duplicates() {
        let store = InMemoryStore::new();

        let first = store.insert("users", doc! { "name": "ada" }).await.unwrap();
        assert_eq!(first.inserted, 1);
        let id = first.generated_keys[0].clone();

        let rows = store.execute("users", &by_id(&id)).await.unwrap();
        assert_eq!(rows, vec![doc! { "name": "ada", "id": id.clone() }]);

        let again = store
            .insert("users", doc! { "id": id.clone(), "name": "eve" })
            .await
            .unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.errors, 1);
        assert!(again.first_error.unwrap().contains("Duplicate primary key"));
    }

    #[tokio::test]
    async fn update_counts_replaced_and_unchanged_rows() {
        let store = InMemoryStore::new();
        store.insert("t", doc! { "id": 1, "v": "a" }).await.unwrap();
        store.insert("t", doc! { "id": 2, "v": "b" }).await.unwrap();

        let result = store
            .update("t", &Query::new(), doc! { "v": "b" })
            .await
            .unwrap();
        assert_eq!((result.replaced, result.unchanged), (1, 1));

        let missing = store
            .update("t", &by_id(&Bson::Int32(9)), doc! { "v": "c" })
            .await
            .unwrap();
        assert_eq!((missing.replaced, missing.errors), (0, 0));

        let rekey = store
            .update("t", &by_id(&Bson::Int32(1)), doc! { "id": 5 })
            .await
            .unwrap();
        assert_eq!(rekey.errors, 1);
    }

    #[tokio::test]
    async fn delete_honours_order_and_limit() {
        let store = InMemoryStore::new();
        for score in [5, 1, 9, 3] {
            store.insert("scores", doc! { "score": score }).await.unwrap();
        }

        let query = Query::builder().order_by("-score").limit(2).build();
        let result = store.delete("scores", &query).await.unwrap();
        assert_eq!(result.deleted, 2);

        let remaining = store
            .execute("scores", &Query::builder().order_by("score").build())
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.get_i32("score").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(remaining, vec![1, 3]);
    }

    #[tokio::test]
    async fn count_matches_execute() {
        let store = InMemoryStore::new();
        for n in 0..5 {
            store.insert("n", doc! { "n": n }).await.unwrap();
        }

        let query = Query::builder().filter(Filter::gte("n", 2)).limit(2).build();
        assert_eq!(store.count("n", &query).await.unwrap(), 2);
        assert_eq!(store.count("n", &Query::builder().filter(Filter::gte("n", 2)).build()).await.unwrap(), 3);
        assert_eq!(store.count("missing", &Query::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn strict_store_requires_created_collections() {
        let store = InMemoryStore::builder()
            .with_collection("known")
            .strict(true)
            .build()
            .await
            .unwrap();

        assert!(store.insert("known", doc! { "a": 1 }).await.is_ok());

        let err = store.insert("unknown", doc! { "a": 1 }).await.unwrap_err();
        assert!(matches!(err, RecordError::CollectionNotFound(ref name) if name == "unknown"));
        assert!(store.execute("unknown", &Query::new()).await.is_err());
    }

    #[tokio::test]
    async fn collections_can_be_listed_and_dropped() {
        let store = InMemoryStore::new();
        store.create_collection("b").await.unwrap();
        store.create_collection("a").await.unwrap();

        assert_eq!(store.list_collections().await.unwrap(), vec!["a", "b"]);

        store.drop_collection("a").await.unwrap();
        assert!(matches!(
            store.drop_collection("a").await,
            Err(RecordError::CollectionNotFound(_))
        ));
    }
}
