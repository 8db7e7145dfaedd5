// Store access - the seam between the services and a document store

pub mod matcher;
mod sqlite;

pub use matcher::Matcher;
pub use sqlite::SqliteStore;

use crate::document::Document;
use crate::error::Result;
use crate::filter::FilterExpression;
use crate::pagination::{Pagination, SortSpec};
use crate::value::ObjectId;
use serde::Serialize;

/// Options for a paged query, derived from a [`Pagination`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindOptions {
    pub skip: i64,
    pub limit: i64,
    pub sort: Option<SortSpec>,
}

impl FindOptions {
    /// No skip, no limit, natural order.
    pub fn all() -> Self {
        FindOptions {
            skip: 0,
            limit: 0,
            sort: None,
        }
    }

    /// `{skip, limit, sort: {field: ±1}}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "skip": self.skip,
            "limit": self.limit,
            "sort": self.sort.as_ref().map(SortSpec::to_json),
        })
    }
}

impl From<&Pagination> for FindOptions {
    fn from(pagination: &Pagination) -> Self {
        FindOptions {
            skip: pagination.skip(),
            limit: pagination.limit(),
            sort: Some(pagination.sort.clone()),
        }
    }
}

/// One page of documents plus the number of documents matching the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FindResult {
    pub total: u64,
    pub documents: Vec<Document>,
}

/// A document store that executes filter expressions.
///
/// Identifiers come back in the store's native form (`{"$oid": ..}`);
/// reshaping them is left to the caller.
pub trait DocumentStore {
    /// Verify the store is reachable.
    fn connect(&self) -> Result<()>;

    fn count(&self, collection: &str, filter: &FilterExpression) -> Result<u64>;

    fn find(
        &self,
        collection: &str,
        filter: &FilterExpression,
        options: &FindOptions,
    ) -> Result<FindResult>;

    /// The first document matching `filter` in natural order.
    fn find_one(&self, collection: &str, filter: &FilterExpression) -> Result<Option<Document>>;

    /// Insert documents, assigning an `_id` to those without one.
    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<ObjectId>>;

    /// Merge `fields` into the first matching document. Returns the modified count.
    fn update_one(
        &self,
        collection: &str,
        filter: &FilterExpression,
        fields: &Document,
    ) -> Result<u64>;

    /// Merge `fields` into every matching document. Returns the modified count.
    fn update_many(
        &self,
        collection: &str,
        filter: &FilterExpression,
        fields: &Document,
    ) -> Result<u64>;

    fn delete_many(&self, collection: &str, filter: &FilterExpression) -> Result<u64>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn connect(&self) -> Result<()> {
        (**self).connect()
    }

    fn count(&self, collection: &str, filter: &FilterExpression) -> Result<u64> {
        (**self).count(collection, filter)
    }

    fn find(
        &self,
        collection: &str,
        filter: &FilterExpression,
        options: &FindOptions,
    ) -> Result<FindResult> {
        (**self).find(collection, filter, options)
    }

    fn find_one(&self, collection: &str, filter: &FilterExpression) -> Result<Option<Document>> {
        (**self).find_one(collection, filter)
    }

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<ObjectId>> {
        (**self).insert_many(collection, documents)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &FilterExpression,
        fields: &Document,
    ) -> Result<u64> {
        (**self).update_one(collection, filter, fields)
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &FilterExpression,
        fields: &Document,
    ) -> Result<u64> {
        (**self).update_many(collection, filter, fields)
    }

    fn delete_many(&self, collection: &str, filter: &FilterExpression) -> Result<u64> {
        (**self).delete_many(collection, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{validate_pagination, PaginationRequest};

    #[test]
    fn test_find_options_from_pagination() {
        let pagination =
            validate_pagination(&PaginationRequest::new().page(3).per_page(10).sort("-store"));
        let options = FindOptions::from(&pagination);
        assert_eq!(
            options.to_json(),
            serde_json::json!({ "skip": 20, "limit": 10, "sort": { "store": -1 } })
        );
    }
}
