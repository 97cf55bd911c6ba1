use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, CountOptions, FindOptions},
};
use tracing::debug;
use uuid::Uuid;

use recordlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder, WriteResult},
    error::{RecordError, RecordResult},
    query::Query,
    record::ID_KEY,
};

use crate::query::{MONGO_ID, MongoQueryTranslator};

const DUPLICATE_KEY: i32 = 11000;
const NAMESPACE_EXISTS: i32 = 48;

fn backend_error(error: MongoError) -> RecordError {
    RecordError::Backend(error.to_string())
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == DUPLICATE_KEY
    )
}

fn is_namespace_exists(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Command(failure) if failure.code == NAMESPACE_EXISTS
    )
}

/// Renames the stored `_id` back to `id`.
fn restore_document(mut document: Document) -> Document {
    if let Some(id) = document.remove(MONGO_ID) {
        document.insert(ID_KEY, id);
    }

    document
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn find_options(query: &Query) -> FindOptions {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        options.sort = MongoQueryTranslator::sort(&query.sort);

        options
    }

    /// Resolves the filter for a write. Ordered or limited selections are first narrowed to the
    /// primary keys they cover, since MongoDB writes take neither.
    async fn write_filter(&self, collection: &str, query: &Query) -> RecordResult<Document> {
        let filter = MongoQueryTranslator::translate(query.filter.as_ref())?;

        if query.limit.is_none() {
            return Ok(filter);
        }

        let mut options = Self::find_options(query);
        options.projection = Some(doc! { MONGO_ID: 1 });

        let ids = self
            .get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .filter_map(|mut document| document.remove(MONGO_ID))
            .collect::<Vec<Bson>>();

        Ok(doc! { MONGO_ID: { "$in": ids } })
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert(&self, collection: &str, mut document: Document) -> RecordResult<WriteResult> {
        let (id, generated) = match document.remove(ID_KEY) {
            Some(id) if id != Bson::Null => (id, false),
            _ => (Bson::String(Uuid::new_v4().to_string()), true),
        };
        document.insert(MONGO_ID, id.clone());

        match self.get_collection(collection).insert_one(document).await {
            Ok(_) if generated => Ok(WriteResult::inserted(id)),
            Ok(_) => Ok(WriteResult {
                inserted: 1,
                ..WriteResult::default()
            }),
            Err(err) if is_duplicate_key(&err) => {
                debug!(collection, %id, "rejected duplicate primary key");
                Ok(WriteResult::failed(err.to_string()))
            }
            Err(err) => Err(backend_error(err)),
        }
    }

    async fn update(
        &self,
        collection: &str,
        query: &Query,
        mut changes: Document,
    ) -> RecordResult<WriteResult> {
        let filter = self.write_filter(collection, query).await?;
        let mut result = WriteResult::default();

        // MongoDB primary keys are immutable; restating the same key is harmless.
        if let Some(id) = changes.remove(ID_KEY) {
            let renaming = self
                .get_collection(collection)
                .count_documents(doc! { "$and": [filter.clone(), { MONGO_ID: { "$ne": id } }] })
                .await
                .map_err(backend_error)?;

            if renaming > 0 {
                result.push_error(format!("Primary key `{ID_KEY}` cannot be changed"));
                return Ok(result);
            }
        }

        if changes.is_empty() {
            result.unchanged = self
                .get_collection(collection)
                .count_documents(filter)
                .await
                .map_err(backend_error)?;
            return Ok(result);
        }

        let outcome = self
            .get_collection(collection)
            .update_many(filter, doc! { "$set": changes })
            .await
            .map_err(backend_error)?;

        result.replaced = outcome.modified_count;
        result.unchanged = outcome.matched_count - outcome.modified_count;

        Ok(result)
    }

    async fn delete(&self, collection: &str, query: &Query) -> RecordResult<WriteResult> {
        let filter = self.write_filter(collection, query).await?;

        let outcome = self
            .get_collection(collection)
            .delete_many(filter)
            .await
            .map_err(backend_error)?;

        Ok(WriteResult {
            deleted: outcome.deleted_count,
            ..WriteResult::default()
        })
    }

    async fn execute(&self, collection: &str, query: &Query) -> RecordResult<Vec<Document>> {
        Ok(self
            .get_collection(collection)
            .find(MongoQueryTranslator::translate(query.filter.as_ref())?)
            .with_options(Self::find_options(query))
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .map(restore_document)
            .collect())
    }

    async fn count(&self, collection: &str, query: &Query) -> RecordResult<u64> {
        let mut options = CountOptions::default();
        options.limit = query.limit.map(|limit| limit as u64);

        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::translate(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(backend_error)
    }

    async fn create_collection(&self, name: &str) -> RecordResult<()> {
        match self
            .client
            .database(&self.database)
            .create_collection(name)
            .await
        {
            Err(err) if !is_namespace_exists(&err) => Err(backend_error(err)),
            _ => Ok(()),
        }
    }

    async fn drop_collection(&self, name: &str) -> RecordResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error)
    }

    async fn list_collections(&self) -> RecordResult<Vec<String>> {
        self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)
    }

    async fn shutdown(self) -> RecordResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> RecordResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| RecordError::Initialization(e.to_string()))?,
            )
            .map_err(|e| RecordError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restored_rows_expose_id() {
        let row = restore_document(doc! { "_id": "k1", "name": "ada" });

        assert_eq!(row.get_str(ID_KEY).unwrap(), "k1");
        assert!(!row.contains_key(MONGO_ID));
    }
}
