//! Main recordlayer crate providing declarative records over JSON document stores.
//!
//! This crate is the primary entry point for users of the recordlayer framework. It re-exports
//! the core types from the sub-crates and provides access to the storage backends.
//!
//! # Features
//!
//! - **Declarative record types** - Describe fields, defaults and constraints once per type
//! - **Validation and coercion** - Values are checked and converted before every write
//! - **Change tracking** - Saving an unchanged record issues no write
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::LazyLock;
//! use recordlayer::{prelude::*, memory::InMemoryStore};
//!
//! pub struct Contact;
//!
//! impl Model for Contact {
//!     fn collection_name() -> &'static str { "contacts" }
//!
//!     fn schema() -> &'static Schema {
//!         static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
//!             Schema::builder()
//!                 .field("name", TextField::new().max_length(64))
//!                 .field("age", IntegerField::new().positive_only().required(false))
//!                 .build()
//!         });
//!         &SCHEMA
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> RecordResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!
//!     // Insert: the store assigns the identifier
//!     let mut contact = store.record_from::<Contact>(doc! { "name": "Alice" })?;
//!     contact.save().await?;
//!
//!     // Update: only dirty records are written
//!     contact.set("age", 31);
//!     contact.save().await?;
//!
//!     // Query by example
//!     let found = store
//!         .record_from::<Contact>(doc! { "name": "Alice" })?
//!         .get()
//!         .await;
//!     println!("{found:?}");
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use recordlayer_core::{backend, error, fields, query, record, schema, store};

// Re-export value types for convenience
pub use bson;
pub use serde_json;

/// In-memory storage backend implementations.
pub mod memory {
    pub use recordlayer_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use recordlayer_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
