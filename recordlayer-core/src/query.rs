//! Logical queries against a named collection.
//!
//! A [`Query`] narrows the rows of a collection with an optional filter [`Expr`], orders them by
//! any number of [`Sort`] keys, and optionally caps the number of rows. Backends interpret a
//! query by walking its filter with a [`QueryVisitor`].
//!
//! # Query Building
//!
//! ```ignore
//! use recordlayer::query::{Query, Filter};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("status", "active").and(Filter::gt("age", 18)))
//!     .order_by("-created_at")
//!     .limit(10)
//!     .build();
//! ```
//!
//! A plain mapping converts into a conjunction of equality tests, which is how records turn
//! their attribute values into search predicates:
//!
//! ```ignore
//! let expr: Expr = bson::doc! { "field1": "x", "field2": "y" }.into();
//! ```

use bson::{Bson, Document};

use crate::error::RecordError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9).
    Asc,
    /// Descending order (Z to A, 9 to 0).
    Desc,
}

/// One ordering key of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Parses an ordering key: a field name, optionally prefixed with `-` for descending order.
    ///
    /// ```ignore
    /// assert_eq!(Sort::parse("-age").direction, SortDirection::Desc);
    /// ```
    pub fn parse(key: &str) -> Self {
        match key.strip_prefix('-') {
            Some(field) => Sort {
                field: field.to_string(),
                direction: SortDirection::Desc,
            },
            None => Sort {
                field: key.to_string(),
                direction: SortDirection::Asc,
            },
        }
    }
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// A filter expression for querying rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match). An empty list matches every row.
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression.
    Not(Box<Expr>),
    /// Field comparison expression.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended to the list.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended to the list.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Returns `true` for an expression that places no constraint (an empty AND).
    pub fn is_empty(&self) -> bool {
        matches!(self, Expr::And(list) if list.is_empty())
    }
}

impl From<Document> for Expr {
    /// Turns `{k1: v1, k2: v2}` into `k1 == v1 AND k2 == v2`.
    fn from(document: Document) -> Self {
        Expr::And(
            document
                .into_iter()
                .map(|(field, value)| Expr::field(field, FieldOp::Eq, value))
                .collect(),
        )
    }
}

/// A structured query: filter, ordering and row limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression to match rows.
    pub filter: Option<Expr>,
    /// Ordering keys, most significant first.
    pub sort: Vec<Sort>,
    /// Maximum number of rows to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a query matching every row of a collection.
    pub fn new() -> Self {
        Query::default()
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Helper struct for constructing filter expressions.
///
/// ```ignore
/// let expr = Filter::eq("name", "Alice").and(Filter::gte("age", 18));
/// ```
pub struct Filter;

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Combines multiple expressions such that all must match.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Combines multiple expressions such that any can match.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression. An empty expression leaves the query unfiltered.
    pub fn filter(mut self, filter: impl Into<Expr>) -> Self {
        let filter = filter.into();
        self.query.filter = if filter.is_empty() { None } else { Some(filter) };
        self
    }

    /// Appends an ordering key.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort { field: field.into(), direction });
        self
    }

    /// Appends an ordering key parsed with [`Sort::parse`].
    pub fn order_by(mut self, key: &str) -> Self {
        self.query.sort.push(Sort::parse(key));
        self
    }

    /// Caps the number of rows. Zero means no limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks a filter expression, producing a backend-specific output.
pub trait QueryVisitor {
    type Output;
    type Error: Into<RecordError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn sort_spec_prefix_selects_direction() {
        assert_eq!(
            Sort::parse("-created"),
            Sort { field: "created".into(), direction: SortDirection::Desc }
        );
        assert_eq!(Sort::parse("name").direction, SortDirection::Asc);
    }

    #[test]
    fn mapping_becomes_conjunction_of_equalities() {
        let expr: Expr = doc! { "a": 1, "b": "x" }.into();

        assert_eq!(
            expr,
            Expr::And(vec![Filter::eq("a", 1), Filter::eq("b", "x")])
        );
    }

    #[test]
    fn builder_drops_empty_filter_and_zero_limit() {
        let query = Query::builder()
            .filter(Document::new())
            .order_by("-age")
            .order_by("name")
            .limit(0)
            .build();

        assert!(query.filter.is_none());
        assert!(query.limit.is_none());
        assert_eq!(query.sort.len(), 2);
        assert_eq!(query.sort[0].direction, SortDirection::Desc);
    }

    #[test]
    fn and_appends_to_existing_conjunction() {
        let expr = Filter::and([Filter::eq("a", 1)]).and(Filter::lt("b", 2));

        assert!(matches!(expr, Expr::And(ref list) if list.len() == 2));
    }
}
