//! Record type declarations.
//!
//! A record type is described by a [`Model`]: the collection it lives in, a static [`Schema`]
//! listing its fields, and the convention it uses when exported to JSON.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::LazyLock;
//! use recordlayer::{fields::TextField, schema::{Model, Schema}};
//!
//! pub struct Article;
//!
//! impl Model for Article {
//!     fn collection_name() -> &'static str {
//!         "articles"
//!     }
//!
//!     fn schema() -> &'static Schema {
//!         static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
//!             Schema::builder()
//!                 .field("title", TextField::new().max_length(50))
//!                 .field("summary", TextField::new().required(false))
//!                 .build()
//!         });
//!         &SCHEMA
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::fields::{Field, FieldKind};

/// The declared fields of a record type, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`Schema`]. Registering a field binds it to its attribute name.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Declares a field under `name`. Declaring the same name twice replaces the earlier
    /// declaration in place.
    pub fn field(mut self, name: impl Into<String>, kind: impl Into<FieldKind>) -> Self {
        let field = Field::new(name, kind);

        match self.fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn build(self) -> Schema {
        Schema { fields: self.fields }
    }
}

/// Controls which parts of a record appear in its JSON export.
///
/// Private (`_`-prefixed) attributes and query modifiers are never exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Include the store-assigned identifier under `id`.
    pub include_id: bool,
    /// Include ad-hoc attributes that are not declared fields.
    pub include_extra: bool,
    /// Include attributes whose value is null.
    pub include_null: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_id: true,
            include_extra: true,
            include_null: true,
        }
    }
}

/// A record type: a named collection plus the fields declared for it.
pub trait Model: Send + Sync + 'static {
    /// Returns the name of the collection records of this type are stored in.
    fn collection_name() -> &'static str;

    /// Returns the field declarations for this record type.
    fn schema() -> &'static Schema;

    /// Returns this record type's JSON export convention.
    fn export_options() -> ExportOptions {
        ExportOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{IntegerField, TextField};

    #[test]
    fn fields_keep_declaration_order_and_bound_names() {
        let schema = Schema::builder()
            .field("title", TextField::new())
            .field("views", IntegerField::new().with_default(0))
            .build();

        let names = schema.fields().map(|f| f.name()).collect::<Vec<_>>();
        assert_eq!(names, vec!["title", "views"]);
        assert_eq!(schema.field("views").unwrap().label().to_string(), "views (integer)");
        assert!(!schema.contains("missing"));
    }

    #[test]
    fn redeclaring_a_field_replaces_it() {
        let schema = Schema::builder()
            .field("title", TextField::new())
            .field("title", TextField::new().required(false))
            .build();

        assert_eq!(schema.len(), 1);
        assert!(!schema.field("title").unwrap().is_required());
    }
}
