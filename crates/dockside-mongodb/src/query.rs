//! Filter-to-query translation for MongoDB operations
//!
//! This module is the core of the adapter: it converts the generic filter
//! shape handed in by the ORM layer (where-clause, ordering, pagination,
//! nested includes) into the query and sort documents the driver understands.

use bson::{doc, Bson, Document};
use dockside_common::{DocksideError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// BSON type tag for the deprecated "undefined" value. A `null` constraint in
/// a where-clause matches fields holding this type, distinct from fields that
/// are missing entirely.
const BSON_TYPE_UNDEFINED: i32 = 10;

/// Ordering specification: either a comma-separated clause string
/// (`"name ASC, age DESC"`) or a mapping from field to direction token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Order {
    Clauses(String),
    Fields(Document),
}

/// Generic query filter handed in by the ORM layer.
///
/// Every field is optional; an empty filter selects everything. Nested
/// `include` filters recursively reuse this same shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// Per-field constraints; see [`parse_where`] for value semantics.
    pub r#where: Option<Document>,
    /// Shorthand equality on the primary identifier.
    pub id: Option<Bson>,
    pub order: Option<Order>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    /// Fallback skip value, consulted only when `skip` is absent.
    pub offset: Option<u64>,
    pub projection: Option<Document>,
    /// Related collections to fetch alongside this query, each with its own
    /// nested filter. Results attach once to the whole result set.
    pub include: Option<HashMap<String, Filter>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the where-clause document
    pub fn where_clause(mut self, clause: Document) -> Self {
        self.r#where = Some(clause);
        self
    }

    /// Set the identifier shorthand; overrides any where-clause
    pub fn id(mut self, id: impl Into<Bson>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the ordering from a clause string
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(Order::Clauses(order.into()));
        self
    }

    /// Set the maximum number of records to return
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the number of records to skip
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the returned-field projection
    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Attach a related collection to fetch alongside this query
    pub fn include(mut self, collection: impl Into<String>, filter: Filter) -> Self {
        self.include
            .get_or_insert_with(HashMap::new)
            .insert(collection.into(), filter);
        self
    }
}

/// Translate a where-shaped mapping into a native query document.
///
/// An `id` key short-circuits the whole mapping to an `_id` match; any
/// sibling keys are ignored in that case (documented behavior of the
/// contract, not a bug). Otherwise each entry translates as:
/// - nested document -> passed through verbatim (native operators such as
///   `{ "$gte": 18 }` work unmodified)
/// - `null` -> matches fields holding the undefined value type
/// - anything else -> equality constraint
pub fn parse_where(filter: &Document) -> Result<Document> {
    if let Some(id) = filter.get("id") {
        if id != &Bson::Null {
            return Ok(doc! { "_id": crate::identifier::normalize(id.clone())? });
        }
    }

    let mut query = Document::new();
    for (field, value) in filter {
        match value {
            Bson::Document(_) => {
                query.insert(field.clone(), value.clone());
            }
            Bson::Null => {
                query.insert(field.clone(), doc! { "$type": BSON_TYPE_UNDEFINED });
            }
            other => {
                query.insert(field.clone(), other.clone());
            }
        }
    }

    Ok(query)
}

/// Normalize an ordering specification into a native sort document.
///
/// Clause strings split on commas, then on whitespace, into
/// `(field, direction)` pairs; a clause missing either component is a
/// validation error, returned through the same channel as every other
/// failure. Direction tokens ending in a literal `DESC` sort descending;
/// any other token (including lowercase variants) sorts ascending.
pub fn parse_order(order: &Order) -> Result<Document> {
    let mut sort = Document::new();

    match order {
        Order::Clauses(clauses) => {
            for clause in clauses.split(',') {
                let mut parts = clause.split_whitespace();
                let (field, direction) = match (parts.next(), parts.next()) {
                    (Some(field), Some(direction)) => (field, direction),
                    _ => {
                        return Err(DocksideError::Validation(
                            "Invalid ordering set.".to_string(),
                        ))
                    }
                };
                sort.insert(field, direction_value(direction));
            }
        }
        Order::Fields(fields) => {
            for (field, token) in fields {
                let token = token.as_str().ok_or_else(|| {
                    DocksideError::Validation(format!(
                        "Invalid ordering direction for field '{}'",
                        field
                    ))
                })?;
                sort.insert(field.clone(), direction_value(token));
            }
        }
    }

    Ok(sort)
}

/// Map a direction token to a native sort value. Case-sensitive: only a
/// trailing `DESC` sorts descending, everything else defaults to ascending.
fn direction_value(token: &str) -> i32 {
    if token.trim_end().ends_with("DESC") {
        -1
    } else {
        1
    }
}
