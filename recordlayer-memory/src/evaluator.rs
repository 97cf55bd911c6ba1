//! Query expression evaluation for in-memory row filtering and ordering.

use bson::{Bson, Document, datetime::DateTime};
use std::{cmp::Ordering, collections::HashMap};

use recordlayer_core::{
    error::{RecordError, RecordResult},
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to `f64` so that `2`, `2_i64` and `2.0` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    DateTime(DateTime),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Any other BSON value (object ids, binary, decimals, ...), compared by BSON equality.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::Array(values) => Comparable::Array(values.iter().map(Comparable::from).collect()),
            Bson::Document(document) => Comparable::Map(
                document
                    .iter()
                    .map(|(key, value)| (key.as_str(), Comparable::from(value)))
                    .collect(),
            ),
            Bson::Null => Comparable::Null,
            other => Comparable::Other(other),
        }
    }
}

impl Comparable<'_> {
    /// Position of the value's type in the cross-type ordering used for sorting.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::DateTime(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Map(_) => 6,
            Comparable::Other(_) => 7,
        }
    }

    /// Orders any two values: by type rank first, then by value within a type.
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::Other(a), Comparable::Other(b)) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }
}

/// Compares two rows by a list of sort keys, most significant first.
///
/// A missing field sorts like null, before every other value.
pub(crate) fn compare_rows(left: &Document, right: &Document, sort: &[Sort]) -> Ordering {
    for key in sort {
        let a = left.get(&key.field).map(Comparable::from).unwrap_or(Comparable::Null);
        let b = right.get(&key.field).map(Comparable::from).unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => a.total_cmp(&b),
            SortDirection::Desc => b.total_cmp(&a),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Evaluates a filter expression against a single row.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> RecordResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns `true` when `document` satisfies `expr`. Evaluation errors count as a mismatch.
    pub fn matches(document: &Document, expr: &Expr) -> bool {
        DocumentEvaluator::new(document)
            .evaluate(expr)
            .unwrap_or(false)
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = RecordError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        // Rows lacking the field never match, whatever the operator.
        let Some(field_value) = self.document.get(field) else {
            return Ok(false);
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => left != right,
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match left.partial_cmp(&right) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering.is_gt(),
                        FieldOp::Gte => ordering.is_ge(),
                        FieldOp::Lt => ordering.is_lt(),
                        _ => ordering.is_le(),
                    },
                    None => false,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use recordlayer_core::query::Filter;

    #[test]
    fn numbers_compare_across_widths() {
        let row = doc! { "a": 2_i64, "b": 2.5 };

        assert!(DocumentEvaluator::matches(&row, &Filter::eq("a", 2)));
        assert!(DocumentEvaluator::matches(&row, &Filter::gt("b", 2)));
        assert!(!DocumentEvaluator::matches(&row, &Filter::lte("b", 2.0)));
    }

    #[test]
    fn missing_fields_and_mismatched_types_never_match() {
        let row = doc! { "name": "ada" };

        assert!(!DocumentEvaluator::matches(&row, &Filter::ne("age", 3)));
        assert!(!DocumentEvaluator::matches(&row, &Filter::gt("name", 3)));
    }

    #[test]
    fn combinators_follow_boolean_logic() {
        let row = doc! { "a": 1, "b": "x" };
        let expr = Filter::or([Filter::eq("a", 2), Filter::eq("b", "x").not()]);

        assert!(!DocumentEvaluator::matches(&row, &expr));
        assert!(DocumentEvaluator::matches(&row, &Filter::and([])));
        assert!(DocumentEvaluator::matches(&row, &Filter::eq("a", 2).not()));
    }

    #[test]
    fn opaque_values_match_only_themselves() {
        let (mine, theirs) = (ObjectId::new(), ObjectId::new());
        let row = doc! { "owner": mine, "note": Bson::Null };

        assert!(DocumentEvaluator::matches(&row, &Filter::eq("owner", mine)));
        assert!(!DocumentEvaluator::matches(&row, &Filter::eq("owner", theirs)));
        assert!(DocumentEvaluator::matches(&row, &Filter::ne("owner", theirs)));
        assert!(!DocumentEvaluator::matches(&row, &Filter::eq("note", theirs)));
        assert!(!DocumentEvaluator::matches(&row, &Filter::gt("owner", theirs)));
    }

    #[test]
    fn rows_order_by_successive_keys() {
        let sort = [Sort::parse("group"), Sort::parse("-score")];
        let a = doc! { "group": 1, "score": 10 };
        let b = doc! { "group": 1, "score": 20 };
        let c = doc! { "score": 99 };

        assert_eq!(compare_rows(&a, &b, &sort), Ordering::Greater);
        assert_eq!(compare_rows(&c, &a, &sort), Ordering::Less);
        assert_eq!(compare_rows(&a, &a, &sort), Ordering::Equal);
    }
}
