//! Convenient re-exports of commonly used types from recordlayer.
//!
//! ```ignore
//! use recordlayer::prelude::*;
//! ```

pub use bson::{Bson, Document, doc};

pub use recordlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder, WriteResult},
    error::{RecordError, RecordResult, ValidationError},
    fields::{BooleanField, Field, FieldKind, FloatField, IntegerField, LongField, TextField},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    record::{Record, Saved},
    schema::{ExportOptions, Model, Schema},
    store::DocumentStore,
};
