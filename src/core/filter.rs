//! Filter evaluation
//!
//! Compiles typed filter clauses against a resource schema into a
//! [`Selector`] that storage implementations evaluate per document.
//! Clauses are combined with AND semantics; there is no OR.

use crate::core::error::{AdminResult, ValidationError};
use crate::core::field::{FieldKind, FieldValue};
use crate::core::query::{FilterClause, FilterOp, ResourceQuery, SortDirection, SortKey};
use crate::core::resource::{Resource, ResourceSchema};
use crate::core::store::{Collection, FindOptions};
use std::cmp::Ordering;

/// A compiled, schema-checked predicate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    clauses: Vec<FilterClause>,
}

impl Selector {
    /// Matches every document
    pub fn all() -> Self {
        Self::default()
    }

    /// `field == value`, for internal lookups by a known field
    pub fn eq(field: &str, value: impl ToString) -> Self {
        Self {
            clauses: vec![FilterClause {
                field: field.to_string(),
                op: FilterOp::Equals,
                values: vec![value.to_string()],
            }],
        }
    }

    /// Check client clauses against the schema
    ///
    /// Unknown or non-readable fields fail, as does `~`/`!~` on a
    /// non-string field.
    pub fn compile(
        schema: &ResourceSchema,
        clauses: &[FilterClause],
    ) -> Result<Self, ValidationError> {
        for clause in clauses {
            let Some(def) = schema.readable_field(&clause.field) else {
                return Err(ValidationError::unknown_field(
                    "filters",
                    &clause.field,
                    schema.plural,
                ));
            };

            let substring = matches!(clause.op, FilterOp::Contains | FilterOp::NotContains);
            if substring && def.kind != FieldKind::String {
                return Err(ValidationError::field(
                    "filters",
                    clause.field.as_str(),
                    "syntax",
                    format!(
                        "'{}' is not a string field and cannot be used with ~ or !~",
                        clause.field
                    ),
                ));
            }
        }

        Ok(Self {
            clauses: clauses.to_vec(),
        })
    }

    /// Whether the selector has no clauses
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate against one entity
    pub fn matches<T: Resource>(&self, entity: &T) -> bool {
        self.clauses.iter().all(|clause| {
            let value = entity.field_value(&clause.field).unwrap_or(FieldValue::Null);
            let any = || clause.values.iter().any(|v| value.matches_literal(v));
            let first = clause.values.first().map(String::as_str).unwrap_or("");

            match clause.op {
                FilterOp::Equals => value.matches_literal(first),
                FilterOp::NotEquals => !value.matches_literal(first),
                FilterOp::Contains => value.contains_literal(first),
                FilterOp::NotContains => !value.contains_literal(first),
                FilterOp::In => any(),
                FilterOp::NotIn => !any(),
            }
        })
    }
}

/// Check sort keys against the schema
pub fn validate_sort(schema: &ResourceSchema, keys: &[SortKey]) -> Result<(), ValidationError> {
    match keys.iter().find(|k| schema.readable_field(&k.field).is_none()) {
        Some(key) => Err(ValidationError::unknown_field(
            "sort",
            &key.field,
            schema.plural,
        )),
        None => Ok(()),
    }
}

/// Stable multi-key comparison of two entities
pub fn compare_by<T: Resource>(a: &T, b: &T, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = a.field_value(&key.field).unwrap_or(FieldValue::Null);
        let right = b.field_value(&key.field).unwrap_or(FieldValue::Null);
        let ordering = match key.direction {
            SortDirection::Asc => left.compare(&right),
            SortDirection::Desc => right.compare(&left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// One page of matching entities plus the total match count
#[derive(Debug, Clone)]
pub struct FilteredPage<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Runs a [`ResourceQuery`] against a [`Collection`]
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Find the requested page and, independently, the total count
    pub async fn find_page<T: Resource>(
        collection: &dyn Collection<T>,
        query: &ResourceQuery,
    ) -> AdminResult<FilteredPage<T>> {
        let schema = T::schema();
        let selector = Selector::compile(schema, &query.filters)?;
        validate_sort(schema, &query.sort)?;

        let options = FindOptions {
            sort: query.sort.clone(),
            skip: query.pagination.offset(),
            limit: Some(query.pagination.size),
        };

        let items = collection.find(&selector, &options).await?;
        let total = collection.count(&selector).await?;

        tracing::debug!(
            resource = schema.plural,
            returned = items.len(),
            total,
            "evaluated filters"
        );

        Ok(FilteredPage { items, total })
    }
}
