//! The adapter surface: collection registry plus CRUD operations
//!
//! The `Adapter` struct is an explicit store handle owning the connection and
//! a map from collection name to registered collection handle. There is no
//! ambient registry; every operation goes through a handle reference.

use crate::connection::{Connection, PoolConfig};
use crate::identifier;
use crate::query::{self, Filter};
use crate::settings::Settings;
use bson::{doc, Bson, Document};
use dockside_common::{DocksideError, Result};
use futures::future::{self, BoxFuture};
use futures::TryStreamExt;
use mongodb::Collection;
use std::collections::HashMap;
use tracing::{debug, info};

/// A collection registered via [`Adapter::define`], carrying its driver
/// handle and the schema descriptor supplied by the host framework. The
/// descriptor is stored opaquely and never interpreted here.
struct RegisteredCollection {
    handle: Collection<Document>,
    model: serde_json::Value,
}

/// The ordered records produced by [`Adapter::all`], plus any related
/// collections requested via `include`. Includes attach once to the whole
/// result set, keyed by collection name, not to individual records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub records: Vec<Document>,
    pub included: HashMap<String, ResultSet>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Store handle exposing the ORM-style data-access contract against MongoDB.
pub struct Adapter {
    connection: Connection,
    collections: HashMap<String, RegisteredCollection>,
}

impl Adapter {
    /// Connect with default pool settings.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        Self::connect_with_config(settings, PoolConfig::default()).await
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(settings: &Settings, config: PoolConfig) -> Result<Self> {
        info!(uri = %settings.redacted_uri(), "opening connection");
        let uri = settings.connection_uri();
        debug!(uri = %uri, "connection uri");

        let connection = Connection::with_config(&uri, config).await?;

        Ok(Self {
            connection,
            collections: HashMap::new(),
        })
    }

    /// Wrap an already-open connection.
    pub fn with_connection(connection: Connection) -> Self {
        Self {
            connection,
            collections: HashMap::new(),
        }
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Register a named collection with its schema descriptor.
    pub fn define(&mut self, name: impl Into<String>, model: serde_json::Value) {
        let name = name.into();
        info!(collection = %name, "storing collection");
        debug!(model = %model, "collection model");

        let handle = self.connection.collection(&name);
        self.collections.insert(name, RegisteredCollection { handle, model });
    }

    /// The schema descriptor registered for a collection, if any.
    pub fn model(&self, collection: &str) -> Option<&serde_json::Value> {
        self.collections.get(collection).map(|r| &r.model)
    }

    fn collection(&self, name: &str) -> Result<&Collection<Document>> {
        self.collections
            .get(name)
            .map(|registered| &registered.handle)
            .ok_or_else(|| DocksideError::Query(format!("Collection '{}' is not defined", name)))
    }

    /// Insert a record and return the identifier the store assigned.
    ///
    /// A `null` id is dropped so the store assigns one; a present id is
    /// renamed to the native identifier field before insertion.
    pub async fn create(&self, collection: &str, mut record: Document) -> Result<Bson> {
        match record.remove("id") {
            Some(Bson::Null) | None => {}
            Some(id) => {
                record.insert("_id", id);
            }
        }

        let result = self.collection(collection)?.insert_one(record).await?;
        Ok(result.inserted_id)
    }

    /// Full-document replace of the record selected by its `where` clause or
    /// `id` field.
    pub async fn update(&self, collection: &str, mut record: Document) -> Result<()> {
        let query = write_query(&mut record)?;
        self.collection(collection)?.replace_one(query, record).await?;
        Ok(())
    }

    /// Set the record's fields on the first match, inserting if nothing
    /// matches. Returns the record with its (possibly freshly assigned)
    /// identifier under `id`.
    pub async fn upsert(&self, collection: &str, mut record: Document) -> Result<Document> {
        let query = upsert_query(&mut record)?;

        self.collection(collection)?
            .update_one(query, doc! { "$set": record.clone() })
            .upsert(true)
            .await?;

        Ok(record)
    }

    /// Delete every record matching the `where` clause or `id` field.
    /// Returns the raw deleted count from the store.
    pub async fn remove(&self, collection: &str, mut record: Document) -> Result<u64> {
        let query = write_query(&mut record)?;
        let result = self.collection(collection)?.delete_many(query).await?;
        Ok(result.deleted_count)
    }

    /// Probe for at least one match, projecting only the identifier.
    pub async fn exists(&self, collection: &str, clause: Document) -> Result<bool> {
        let query = query::parse_where(&clause)?;

        let found = self
            .collection(collection)?
            .find_one(query)
            .projection(doc! { "_id": 1 })
            .await?;

        Ok(found.map_or(false, |record| record.get("_id").is_some()))
    }

    /// Fetch a single record.
    ///
    /// An `id` key becomes a native identifier match while sibling keys pass
    /// through verbatim; without `id` the clause goes through the regular
    /// where-translation. Results are returned as stored, without the `id`
    /// mirroring the bulk read path performs.
    pub async fn find(
        &self,
        collection: &str,
        mut clause: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>> {
        let query = match clause.get("id") {
            Some(id) if id != &Bson::Null => {
                let id = id.clone();
                clause.remove("id");
                clause.insert("_id", identifier::normalize(id)?);
                clause
            }
            _ => query::parse_where(&clause)?,
        };

        let mut op = self.collection(collection)?.find_one(query);
        if let Some(projection) = projection {
            op = op.projection(projection);
        }

        Ok(op.await?)
    }

    /// Fetch an ordered sequence of records, with pagination and any
    /// requested related collections.
    ///
    /// Nested includes run as concurrent independent reads; the result is
    /// only produced once every one of them has completed, with each set
    /// attached under its collection name regardless of completion order.
    /// Any failure aborts the whole read and drops partial include results.
    pub fn all<'a>(
        &'a self,
        collection: &'a str,
        filter: Option<Filter>,
    ) -> BoxFuture<'a, Result<ResultSet>> {
        Box::pin(async move {
            let filter = filter.unwrap_or_default();

            // The id shorthand overrides any where clause.
            let base = match &filter.id {
                Some(id) if id != &Bson::Null => {
                    doc! { "_id": identifier::normalize(id.clone())? }
                }
                _ => match &filter.r#where {
                    Some(clause) => query::parse_where(clause)?,
                    None => Document::new(),
                },
            };
            let sort = match &filter.order {
                Some(order) => Some(query::parse_order(order)?),
                None => None,
            };

            let mut find = self.collection(collection)?.find(base);
            if let Some(projection) = filter.projection {
                find = find.projection(projection);
            }
            if let Some(sort) = sort {
                find = find.sort(sort);
            }
            if let Some(limit) = filter.limit {
                find = find.limit(limit);
            }
            if let Some(skip) = filter.skip.or(filter.offset) {
                find = find.skip(skip);
            }

            let cursor = find.await?;
            let mut records: Vec<Document> = cursor.try_collect().await?;
            for record in &mut records {
                mirror_native_id(record);
            }

            let mut result = ResultSet {
                records,
                included: HashMap::new(),
            };

            if let Some(include) = filter.include {
                let reads = include.into_iter().map(|(name, nested)| async move {
                    let set = self.all(&name, Some(nested)).await?;
                    Ok::<_, DocksideError>((name, set))
                });

                for (name, set) in future::try_join_all(reads).await? {
                    result.included.insert(name, set);
                }
            }

            Ok(result)
        })
    }

    /// Count records matching an optional where-clause.
    pub async fn count(&self, collection: &str, clause: Option<Document>) -> Result<u64> {
        let query = match clause {
            Some(clause) => query::parse_where(&clause)?,
            None => Document::new(),
        };

        Ok(self.collection(collection)?.count_documents(query).await?)
    }

    /// Apply a partial update to the first match (by ascending identifier)
    /// and return the matched record.
    pub async fn update_attributes(
        &self,
        collection: &str,
        clause: Document,
        changes: Document,
    ) -> Result<Option<Document>> {
        let query = query::parse_where(&clause)?;

        let updated = self
            .collection(collection)?
            .find_one_and_update(query, doc! { "$set": changes })
            .sort(doc! { "_id": 1 })
            .await?;

        Ok(updated)
    }

    /// Delete every record in a collection. Returns the deleted count.
    pub async fn empty(&self, collection: &str) -> Result<u64> {
        let result = self
            .collection(collection)?
            .delete_many(Document::new())
            .await?;
        Ok(result.deleted_count)
    }

    /// Release the connection.
    pub async fn close(self) {
        self.connection.shutdown().await;
    }
}

/// Build the selection query for update/remove: the record's `where` clause
/// wins, else its `id` field (normalized). Both are stripped from the record
/// so the written payload never carries a stray native identifier.
fn write_query(record: &mut Document) -> Result<Document> {
    if let Some(clause) = record.remove("where") {
        return match clause {
            Bson::Document(clause) => query::parse_where(&clause),
            other => Err(DocksideError::Validation(format!(
                "`where` must be a document, got: {}",
                other
            ))),
        };
    }

    let id = record.remove("id").ok_or_else(|| {
        DocksideError::Query("Record carries neither `where` nor `id`".to_string())
    })?;

    Ok(doc! { "_id": identifier::normalize(id)? })
}

/// Build the selection query for upsert. Without a `where` clause the
/// identifier comes from `id` (normalized), an existing `_id`, or a freshly
/// generated one; whichever is chosen is written back into the record under
/// `id` while any `_id` key is stripped.
fn upsert_query(record: &mut Document) -> Result<Document> {
    if let Some(clause) = record.remove("where") {
        record.remove("_id");
        return match clause {
            Bson::Document(clause) => query::parse_where(&clause),
            other => Err(DocksideError::Validation(format!(
                "`where` must be a document, got: {}",
                other
            ))),
        };
    }

    let id = match record.remove("id") {
        Some(id) if id != Bson::Null => identifier::normalize(id)?,
        _ => match record.remove("_id") {
            Some(native) => native,
            None => identifier::generate(),
        },
    };

    record.remove("_id");
    record.insert("id", id.clone());

    Ok(doc! { "_id": id })
}

/// Copy the native identifier into the canonical `id` field, leaving the
/// native field in place.
fn mirror_native_id(record: &mut Document) {
    if let Some(native) = record.get("_id").cloned() {
        record.insert("id", native);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[test]
    fn test_write_query_prefers_where_clause() {
        let mut record = doc! {
            "where": { "age": { "$gte": 18 } },
            "name": "alice"
        };
        let query = write_query(&mut record).unwrap();
        assert_eq!(query, doc! { "age": { "$gte": 18 } });
        // The clause is stripped from the written payload.
        assert_eq!(record, doc! { "name": "alice" });
    }

    #[test]
    fn test_write_query_falls_back_to_id() {
        let hex = "507f1f77bcf86cd799439011";
        let mut record = doc! { "id": hex, "name": "alice" };
        let query = write_query(&mut record).unwrap();
        assert_eq!(query, doc! { "_id": ObjectId::parse_str(hex).unwrap() });
        assert!(!record.contains_key("id"));
        assert!(!record.contains_key("_id"));
    }

    #[test]
    fn test_write_query_without_selector_errors() {
        let mut record = doc! { "name": "alice" };
        let err = write_query(&mut record).unwrap_err();
        assert!(matches!(err, DocksideError::Query(_)));
    }

    #[test]
    fn test_write_query_rejects_scalar_where() {
        let mut record = doc! { "where": "age > 18" };
        let err = write_query(&mut record).unwrap_err();
        assert!(matches!(err, DocksideError::Validation(_)));
    }

    #[test]
    fn test_upsert_query_normalizes_and_mirrors_id() {
        let hex = "507f1f77bcf86cd799439011";
        let oid = ObjectId::parse_str(hex).unwrap();
        let mut record = doc! { "id": hex, "name": "alice" };

        let query = upsert_query(&mut record).unwrap();
        assert_eq!(query, doc! { "_id": oid });
        // The string id is replaced by its normalized form.
        assert_eq!(record.get("id"), Some(&Bson::ObjectId(oid)));
        assert!(!record.contains_key("_id"));
    }

    #[test]
    fn test_upsert_query_generates_missing_id() {
        let mut record = doc! { "name": "alice" };
        let query = upsert_query(&mut record).unwrap();

        let assigned = query.get("_id").unwrap();
        assert!(matches!(assigned, Bson::ObjectId(_)));
        assert_eq!(record.get("id"), Some(assigned));
    }

    #[test]
    fn test_upsert_query_reuses_native_id() {
        let oid = ObjectId::new();
        let mut record = doc! { "_id": oid, "name": "alice" };

        let query = upsert_query(&mut record).unwrap();
        assert_eq!(query, doc! { "_id": oid });
        assert_eq!(record.get("id"), Some(&Bson::ObjectId(oid)));
        assert!(!record.contains_key("_id"));
    }

    #[test]
    fn test_upsert_query_where_branch_strips_native_id() {
        let mut record = doc! { "where": { "email": "a@b.c" }, "_id": ObjectId::new(), "name": "a" };
        let query = upsert_query(&mut record).unwrap();
        assert_eq!(query, doc! { "email": "a@b.c" });
        assert!(!record.contains_key("_id"));
    }

    #[test]
    fn test_mirror_native_id() {
        let oid = ObjectId::new();
        let mut record = doc! { "_id": oid, "name": "alice" };
        mirror_native_id(&mut record);

        // The canonical field appears; the native field stays in place.
        assert_eq!(record.get("id"), Some(&Bson::ObjectId(oid)));
        assert_eq!(record.get("_id"), Some(&Bson::ObjectId(oid)));
    }

    #[test]
    fn test_mirror_native_id_without_native_field() {
        let mut record = doc! { "name": "alice" };
        mirror_native_id(&mut record);
        assert!(!record.contains_key("id"));
    }

    #[test]
    fn test_result_set_len() {
        let set = ResultSet {
            records: vec![doc! { "a": 1 }, doc! { "a": 2 }],
            included: HashMap::new(),
        };
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert!(ResultSet::default().is_empty());
    }
}
