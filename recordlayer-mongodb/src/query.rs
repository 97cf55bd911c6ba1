//! Query translation from recordlayer expressions to MongoDB query syntax.
//!
//! Rows expose their primary key as `id`; MongoDB stores it as `_id`. The translator renames the
//! key wherever it appears in a filter or an ordering.

use bson::{Bson, Document, doc};

use recordlayer_core::{
    error::{RecordError, RecordResult},
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
    record::ID_KEY,
};

pub(crate) const MONGO_ID: &str = "_id";

/// Maps a row field name to the MongoDB field storing it.
pub(crate) fn mongo_field(field: &str) -> &str {
    if field == ID_KEY { MONGO_ID } else { field }
}

/// Translates recordlayer query expressions into MongoDB filter documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter. No filter matches every document.
    pub fn translate(filter: Option<&Expr>) -> RecordResult<Document> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(Document::new()),
        }
    }

    /// Builds a sort specification, or `None` when no ordering was requested.
    pub fn sort(sort: &[Sort]) -> Option<Document> {
        if sort.is_empty() {
            return None;
        }

        Some(
            sort.iter()
                .map(|key| {
                    let direction = match key.direction {
                        SortDirection::Asc => 1,
                        SortDirection::Desc => -1,
                    };
                    (mongo_field(&key.field).to_string(), Bson::Int32(direction))
                })
                .collect(),
        )
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = RecordError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(Document::new());
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // MongoDB rejects an empty `$or`; an empty disjunction matches nothing.
        if exprs.is_empty() {
            return Ok(doc! { "$expr": false });
        }

        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": vec![self.visit_expr(expr)?],
        })
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let operator = match op {
            FieldOp::Eq => "$eq",
            FieldOp::Ne => "$ne",
            FieldOp::Gt => "$gt",
            FieldOp::Gte => "$gte",
            FieldOp::Lt => "$lt",
            FieldOp::Lte => "$lte",
        };

        Ok(doc! {
            mongo_field(field): { operator: value.clone() },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordlayer_core::query::Filter;

    #[test]
    fn identifier_maps_to_mongo_primary_key() {
        let filter: Expr = doc! { "id": "k1", "name": "ada" }.into();

        assert_eq!(
            MongoQueryTranslator::translate(Some(&filter)).unwrap(),
            doc! {
                "$and": [
                    { "_id": { "$eq": "k1" } },
                    { "name": { "$eq": "ada" } },
                ],
            }
        );
    }

    #[test]
    fn empty_and_missing_filters_match_everything() {
        assert_eq!(MongoQueryTranslator::translate(None).unwrap(), doc! {});
        assert_eq!(
            MongoQueryTranslator::translate(Some(&Filter::and([]))).unwrap(),
            doc! {}
        );
    }

    #[test]
    fn negation_uses_nor() {
        let filter = Filter::gt("age", 18).not();

        assert_eq!(
            MongoQueryTranslator::translate(Some(&filter)).unwrap(),
            doc! { "$nor": [{ "age": { "$gt": 18 } }] }
        );
    }

    #[test]
    fn sort_keys_keep_their_order() {
        let sort = [Sort::parse("-id"), Sort::parse("name")];

        assert_eq!(
            MongoQueryTranslator::sort(&sort),
            Some(doc! { "_id": -1, "name": 1 })
        );
        assert_eq!(MongoQueryTranslator::sort(&[]), None);
    }
}
