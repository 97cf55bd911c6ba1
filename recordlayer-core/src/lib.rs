//! A declarative record mapping layer over JSON document databases.
//!
//! This crate is the core of the recordlayer project and provides:
//!
//! - **Field declarations** ([`fields`]) - Typed fields with coercion and validation rules
//! - **Record types** ([`schema`]) - The `Model` trait and the schema builder
//! - **Record engine** ([`record`]) - Change-tracking records that save, fetch, count and delete
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Query and filtering API** ([`query`]) - Filter expressions, ordering and limits
//! - **Store handle** ([`store`]) - Creates records bound to a backend
//! - **Error handling** ([`error`]) - Validation and store error types
//!
//! # Example
//!
//! ```ignore
//! use std::sync::LazyLock;
//! use recordlayer::prelude::*;
//!
//! pub struct Contact;
//!
//! impl Model for Contact {
//!     fn collection_name() -> &'static str {
//!         "contacts"
//!     }
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
//! let mut contact = store.record_from::<Contact>(doc! { "name": "Ada" })?;
//! contact.save().await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as recordlayer_core;

pub mod backend;
pub mod error;
pub mod fields;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
