//! Change-tracking record instances.
//!
//! A [`Record`] is one row of a [`Model`]'s collection held in memory: the store-assigned
//! identifier, one value per declared field, any ad-hoc attributes, a dirty flag, and the
//! ordering/limit modifiers used by the next query. Every write goes through [`Record::set`],
//! which is what keeps the dirty flag honest; [`Record::save`] is a no-op for a clean record.
//!
//! # Example
//!
//! ```ignore
//! let mut article = store.record_from::<Article>(doc! { "title": "Hello" })?;
//! let saved = article.save().await?;
//!
//! article.set("title", "Hello again");
//! article.save().await?;
//!
//! let newest = store.record::<Article>().order_by(["-published"]).limit(5).all().await?;
//! ```

use bson::{Bson, Document, doc};
use std::{fmt, marker::PhantomData};
use tracing::{debug, trace, warn};

use crate::{
    backend::{StoreBackend, WriteResult},
    error::{RecordError, RecordResult},
    query::{Expr, Query, Sort},
    schema::Model,
};

/// Key under which the store-assigned identifier lives in rows and filters.
pub const ID_KEY: &str = "id";

/// Attributes whose key starts with this prefix are private to the instance.
const PRIVATE_PREFIX: char = '_';

fn is_private(key: &str) -> bool {
    key.starts_with(PRIVATE_PREFIX)
}

/// What [`Record::save`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Saved {
    /// Nothing changed since the last save; no write was issued.
    Clean,
    /// The record was inserted. Holds the store-generated identifier when one was reported.
    Inserted(Option<Bson>),
    /// The record was updated. Holds the raw store result.
    Updated(WriteResult),
}

impl Saved {
    /// Returns `true` when no write was issued.
    pub fn is_clean(&self) -> bool {
        matches!(self, Saved::Clean)
    }

    /// Returns the identifier assigned by an insert.
    pub fn id(&self) -> Option<&Bson> {
        match self {
            Saved::Inserted(id) => id.as_ref(),
            _ => None,
        }
    }
}

/// A live, mutable row of a `M` collection bound to a store backend.
pub struct Record<'a, B: StoreBackend, M: Model> {
    backend: &'a B,
    id: Option<Bson>,
    values: Document,
    extra: Document,
    dirty: bool,
    order_by: Vec<Sort>,
    limit: usize,
    _marker: PhantomData<M>,
}

impl<'a, B: StoreBackend, M: Model> Record<'a, B, M> {
    /// Creates a record with every declared field at its default (or null).
    pub(crate) fn new(backend: &'a B) -> Self {
        Self {
            backend,
            id: None,
            values: M::schema()
                .fields()
                .map(|field| (field.name().to_string(), field.initial_value()))
                .collect(),
            extra: Document::new(),
            dirty: false,
            order_by: Vec::new(),
            limit: 0,
            _marker: PhantomData,
        }
    }

    /// Creates a record and applies `kwargs` on top of the defaults.
    ///
    /// `id` sets the identifier, declared fields are validated, anything else is kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] when a declared field rejects its value.
    pub(crate) fn from_kwargs(backend: &'a B, kwargs: Document) -> RecordResult<Self> {
        let mut record = Self::new(backend);

        for (key, value) in kwargs {
            let value = match M::schema().field(&key) {
                Some(field) => field.validate(Some(&value))?,
                None => value,
            };
            record.set(key, value);
        }

        Ok(record)
    }

    /// Wraps a row returned by the store as a clean record.
    pub(crate) fn from_row(backend: &'a B, row: Document) -> RecordResult<Self> {
        let mut record = Self::from_kwargs(backend, row)?;
        record.dirty = false;

        Ok(record)
    }

    /// Returns the store-assigned identifier, if the record has one.
    pub fn id(&self) -> Option<&Bson> {
        self.id.as_ref()
    }

    /// Returns `true` when the in-memory state diverges from the last save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the current value of an attribute (`id`, a declared field, or an extra).
    pub fn get_value(&self, key: &str) -> Option<&Bson> {
        if key == ID_KEY {
            return self.id.as_ref();
        }

        self.values
            .get(key)
            .or_else(|| self.extra.get(key))
    }

    /// Returns the declared field values.
    pub fn values(&self) -> &Document {
        &self.values
    }

    /// Returns the ad-hoc attributes that are not declared fields.
    pub fn extra(&self) -> &Document {
        &self.extra
    }

    /// Assigns an attribute. Values are validated on [`save`](Record::save), not here.
    ///
    /// Assigning a value different from the current one marks the record dirty, unless the key
    /// is private (`_`-prefixed).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Bson>) -> &mut Self {
        let key = key.into();
        let value = value.into();

        if key == ID_KEY {
            let id = match value {
                Bson::Null => None,
                value => Some(value),
            };
            if self.id != id {
                self.id = id;
                self.dirty = true;
            }
            return self;
        }

        if is_private(&key) {
            self.extra.insert(key, value);
            return self;
        }

        let slot = if M::schema().contains(&key) {
            &mut self.values
        } else {
            &mut self.extra
        };

        if slot.get(&key) != Some(&value) {
            slot.insert(key, value);
            self.dirty = true;
        }

        self
    }

    /// Sets the ordering used by subsequent queries. Prefix a field with `-` for descending order.
    pub fn order_by<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.order_by = fields
            .into_iter()
            .map(|field| Sort::parse(field.as_ref()))
            .collect();
        self
    }

    /// Caps the number of rows returned by subsequent queries. Zero removes the cap.
    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.limit = limit;
        self
    }

    /// Returns the search predicate for this record: every public attribute that is neither
    /// null nor equal to its field's default.
    pub fn filter(&self) -> Document {
        let schema = M::schema();
        let mut filter = Document::new();

        if let Some(id) = &self.id {
            filter.insert(ID_KEY, id.clone());
        }

        for (key, value) in &self.values {
            let is_default = schema
                .field(key)
                .is_some_and(|field| field.is_default(value));

            if *value != Bson::Null && !is_default {
                filter.insert(key.clone(), value.clone());
            }
        }

        for (key, value) in &self.extra {
            if !is_private(key) && *value != Bson::Null {
                filter.insert(key.clone(), value.clone());
            }
        }

        filter
    }

    /// Returns the full attribute mapping written by inserts and updates, without the identifier.
    pub fn document(&self) -> Document {
        let mut document = self.values.clone();

        for (key, value) in &self.extra {
            if !is_private(key) {
                document.insert(key.clone(), value.clone());
            }
        }

        document
    }

    /// Builds a fresh query narrowed by [`filter`](Record::filter).
    pub fn build_query(&self) -> Query {
        self.query_for(None)
    }

    /// Builds a fresh query narrowed by `filter`, falling back to this record's own filter when
    /// `filter` places no constraint.
    pub fn build_query_with(&self, filter: impl Into<Expr>) -> Query {
        self.query_for(Some(filter.into()))
    }

    fn query_for(&self, filter: Option<Expr>) -> Query {
        let filter = filter
            .filter(|expr| !expr.is_empty())
            .unwrap_or_else(|| self.filter().into());

        let mut builder = Query::builder().filter(filter);
        for sort in &self.order_by {
            builder = builder.sort(sort.field.clone(), sort.direction);
        }

        builder.limit(self.limit).build()
    }

    /// Persists pending changes.
    ///
    /// A clean record issues no write. Otherwise every declared field is re-validated (applying
    /// coercion and defaults), then the record is inserted when it has no identifier and updated
    /// by identifier when it has one.
    ///
    /// # Errors
    ///
    /// - [`RecordError::Validation`] when a declared field rejects its value.
    /// - [`RecordError::InsertConflict`] when the store reports more than one insert error.
    /// - [`RecordError::UpdateNotFound`] when the update rewrote no row.
    /// - [`RecordError::UpdateConflict`] when the store reports update errors.
    ///
    /// The record stays dirty after any error, so a later `save` retries the write.
    pub async fn save(&mut self) -> RecordResult<Saved> {
        if !self.dirty {
            return Ok(Saved::Clean);
        }

        for field in M::schema().fields() {
            let validated = field.validate(self.values.get(field.name()))?;
            trace!(field = field.name(), value = %validated, "validated field");
            self.set(field.name(), validated);
        }

        let outcome = self.write().await;
        if outcome.is_err() {
            // The row was not written as intended; the changes stay pending.
            self.dirty = true;
        }

        outcome
    }

    async fn write(&mut self) -> RecordResult<Saved> {
        let collection = M::collection_name();

        match self.id.clone() {
            None => {
                let document = self.document();
                self.dirty = false;

                debug!(collection, "inserting record");
                let result = self.backend.insert(collection, document).await?;
                self.evaluate_insert(result)
            }
            Some(id) => {
                let query = Query::builder().filter(doc! { ID_KEY: id }).build();
                self.dirty = false;

                debug!(collection, "updating record");
                let result = self
                    .backend
                    .update(collection, &query, self.document())
                    .await?;
                self.evaluate_update(result)
            }
        }
    }

    fn evaluate_insert(&mut self, result: WriteResult) -> RecordResult<Saved> {
        if result.errors > 1 {
            return Err(RecordError::InsertConflict(result));
        }

        match result.generated_keys.first() {
            Some(key) if result.inserted == 1 => self.id = Some(key.clone()),
            _ => warn!(
                collection = M::collection_name(),
                %result,
                "insert reported no generated key"
            ),
        }

        Ok(Saved::Inserted(self.id.clone()))
    }

    fn evaluate_update(&self, result: WriteResult) -> RecordResult<Saved> {
        if result.updated() == 0 {
            return Err(RecordError::UpdateNotFound {
                collection: M::collection_name().to_string(),
                result,
            });
        }
        if result.errors > 0 {
            return Err(RecordError::UpdateConflict(result));
        }

        Ok(Saved::Updated(result))
    }

    async fn fetch_one(&self) -> RecordResult<Option<Document>> {
        let mut query = self.build_query();
        query.limit = Some(1);

        Ok(self
            .backend
            .execute(M::collection_name(), &query)
            .await?
            .into_iter()
            .next())
    }

    /// Fetches the first row matching this record's query.
    ///
    /// Any failure, including transport errors, yields `None`. Use
    /// [`try_get`](Record::try_get) to turn a miss into an error instead.
    pub async fn get(&self) -> Option<Document> {
        match self.fetch_one().await {
            Ok(row) => row,
            Err(err) => {
                warn!(collection = M::collection_name(), error = %err, "get failed");
                None
            }
        }
    }

    /// Like [`get`](Record::get), but a miss is an error.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::RowNotFound`] when no row matched or the query failed.
    pub async fn try_get(&self) -> RecordResult<Document> {
        match self.fetch_one().await {
            Ok(Some(row)) => Ok(row),
            Ok(None) => Err(RecordError::RowNotFound(M::collection_name().to_string())),
            Err(err) => {
                debug!(collection = M::collection_name(), error = %err, "get failed");
                Err(RecordError::RowNotFound(M::collection_name().to_string()))
            }
        }
    }

    /// Fetches the first matching row and wraps it as a clean `T` record.
    pub async fn get_as<T: Model>(&self) -> Option<Record<'a, B, T>> {
        self.try_get_as::<T>().await.ok()
    }

    /// Like [`get_as`](Record::get_as), but a miss is an error.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::RowNotFound`] when no row matched, the query failed, or the row
    /// could not be wrapped as a `T`.
    pub async fn try_get_as<T: Model>(&self) -> RecordResult<Record<'a, B, T>> {
        let row = self.try_get().await?;

        Record::from_row(self.backend, row).map_err(|err| {
            debug!(collection = T::collection_name(), error = %err, "row rejected");
            RecordError::RowNotFound(M::collection_name().to_string())
        })
    }

    /// Returns every row matching this record's query.
    pub async fn all(&self) -> RecordResult<Vec<Document>> {
        self.backend
            .execute(M::collection_name(), &self.build_query())
            .await
    }

    /// Returns every matching row wrapped as a clean `T` record.
    ///
    /// # Errors
    ///
    /// Fails when the query fails or a row is rejected by `T`'s field validation.
    pub async fn all_as<T: Model>(&self) -> RecordResult<Vec<Record<'a, B, T>>> {
        self.all()
            .await?
            .into_iter()
            .map(|row| Record::from_row(self.backend, row))
            .collect()
    }

    /// Counts the rows matching this record's query.
    pub async fn count(&self) -> RecordResult<u64> {
        self.backend
            .count(M::collection_name(), &self.build_query())
            .await
    }

    /// Counts the rows matching `filter` (or this record's filter if `filter` is empty).
    pub async fn count_where(&self, filter: impl Into<Expr>) -> RecordResult<u64> {
        self.backend
            .count(M::collection_name(), &self.build_query_with(filter))
            .await
    }

    /// Deletes the rows matching this record's query and returns the raw store result.
    pub async fn delete(&self) -> RecordResult<WriteResult> {
        debug!(collection = M::collection_name(), "deleting records");
        self.backend
            .delete(M::collection_name(), &self.build_query())
            .await
    }

    /// Deletes the rows matching `filter` (or this record's filter if `filter` is empty).
    pub async fn delete_where(&self, filter: impl Into<Expr>) -> RecordResult<WriteResult> {
        debug!(collection = M::collection_name(), "deleting records");
        self.backend
            .delete(M::collection_name(), &self.build_query_with(filter))
            .await
    }

    /// Exports the record as JSON following `M`'s [`ExportOptions`](crate::schema::ExportOptions).
    ///
    /// Private attributes and query modifiers are never exported.
    pub fn to_json(&self) -> RecordResult<serde_json::Value> {
        let options = M::export_options();
        let mut document = Document::new();

        if options.include_id {
            match &self.id {
                Some(id) => {
                    document.insert(ID_KEY, id.clone());
                }
                None if options.include_null => {
                    document.insert(ID_KEY, Bson::Null);
                }
                None => {}
            }
        }

        let extra = self
            .extra
            .iter()
            .filter(|(key, _)| options.include_extra && !is_private(key));

        for (key, value) in self.values.iter().chain(extra) {
            if options.include_null || *value != Bson::Null {
                document.insert(key.clone(), value.clone());
            }
        }

        Ok(serde_json::to_value(&document)?)
    }
}

impl<B: StoreBackend, M: Model> fmt::Debug for Record<'_, B, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("collection", &M::collection_name())
            .field("id", &self.id)
            .field("values", &self.values)
            .field("extra", &self.extra)
            .field("dirty", &self.dirty)
            .finish()
    }
}
