//! In-memory storage backend for recordlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait. It
//! is the reference store used by the test suites and is suitable for development and small
//! deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Store-generated keys** - Rows inserted without an `id` receive a UUID string
//! - **Full query support** - Filtering, multi-key ordering and limits
//! - **Strict mode** - Optionally reject operations on collections that were never created
//!
//! # Quick Start
//!
//! ```ignore
//! use recordlayer::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder()
//!         .with_collection("contacts")
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(backend);
//!
//!     let mut contact = store.record_from::<Contact>(doc! { "name": "Ada" })?;
//!     contact.save().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as recordlayer_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
