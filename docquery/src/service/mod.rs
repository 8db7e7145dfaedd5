// Collection services - pagination, id lookups and result shaping over a store

mod crud;
mod importer;

pub use crud::CrudService;
pub use importer::{ImporterService, JOB_FIELD};

use crate::document::{self, Document, ID_FIELD};
use crate::error::{DocQueryError, Result};
use crate::filter::{FilterBuilder, FilterExpression};
use crate::pagination::{validate_pagination, Pagination, PaginationRequest};
use crate::store::{DocumentStore, FindOptions};
use crate::value::ObjectId;
use serde::Serialize;

/// One page of a collection query, with identifiers as plain strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub total_count: u64,
    pub returned_count: u64,
    pub documents: Vec<Document>,
}

/// Reads and updates collections through a [`DocumentStore`].
///
/// Every call checks the connection first; a store that cannot be reached is
/// reported as [`DocQueryError::Connection`].
pub struct CollectionService<S> {
    store: S,
}

impl<S: DocumentStore> CollectionService<S> {
    pub fn new(store: S) -> Self {
        CollectionService { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fill in defaults for a pagination request.
    pub fn validate_pagination(&self, request: &PaginationRequest) -> Pagination {
        validate_pagination(request)
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        self.store.connect().map_err(|e| {
            log::warn!("store connection failed: {e}");
            match e {
                DocQueryError::Connection(_) => e,
                other => DocQueryError::Connection(other.to_string()),
            }
        })
    }

    /// Number of documents in a collection.
    pub fn collection_count(&self, collection: &str) -> Result<u64> {
        self.ensure_connected()?;
        self.store.count(collection, &FilterExpression::new())
    }

    /// One page of documents matching `filter`.
    pub fn collection(
        &self,
        collection: &str,
        request: &PaginationRequest,
        filter: &FilterExpression,
    ) -> Result<QueryResult> {
        self.ensure_connected()?;
        let pagination = validate_pagination(request);
        self.fetch(collection, &pagination, filter)
    }

    /// Documents whose `_id` is one of `ids`, first page with default ordering.
    pub fn collection_by_ids<I: AsRef<str>>(
        &self,
        collection: &str,
        ids: &[I],
    ) -> Result<QueryResult> {
        self.ensure_connected()?;
        let pagination = validate_pagination(&PaginationRequest::default());
        let ids = ids
            .iter()
            .map(|id| ObjectId::parse_str(id.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut builder = FilterBuilder::new();
        builder.in_values(ID_FIELD, ids);
        self.fetch(collection, &pagination, builder.filters())
    }

    /// Field names of one arbitrary document, in stored order.
    pub fn collection_headers(&self, collection: &str) -> Result<Vec<String>> {
        self.ensure_connected()?;
        let headers = self
            .store
            .find_one(collection, &FilterExpression::new())?
            .map(|doc| doc.keys().cloned().collect())
            .unwrap_or_default();
        Ok(headers)
    }

    /// Prefix search for `value` across every header of the collection,
    /// on top of `base`.
    pub fn quick_search(
        &self,
        collection: &str,
        value: &str,
        request: &PaginationRequest,
        base: &FilterExpression,
    ) -> Result<QueryResult> {
        let headers = self.collection_headers(collection)?;
        let mut builder = FilterBuilder::from(base.clone());
        builder.quick_search(&headers, value, Vec::new());
        self.collection(collection, request, builder.filters())
    }

    /// Delete every document of `job`. Returns the number removed.
    pub fn remove_all(&self, collection: &str, job: &str) -> Result<u64> {
        self.ensure_connected()?;
        let mut builder = FilterBuilder::new();
        builder.equal(JOB_FIELD, job);
        let removed = self.store.delete_many(collection, builder.filters())?;
        log::info!("removed {removed} documents of job {job} from {collection}");
        Ok(removed)
    }

    /// Set `fields` on the document with identifier `id`.
    pub fn update_one(&self, collection: &str, id: &str, fields: &Document) -> Result<u64> {
        self.ensure_connected()?;
        let mut builder = FilterBuilder::new();
        builder.equal(ID_FIELD, ObjectId::parse_str(id)?);
        self.store.update_one(collection, builder.filters(), fields)
    }

    /// Set `fields` on every document matching `filter`.
    pub fn update_many(
        &self,
        collection: &str,
        filter: &FilterExpression,
        fields: &Document,
    ) -> Result<u64> {
        self.ensure_connected()?;
        self.store.update_many(collection, filter, fields)
    }

    fn fetch(
        &self,
        collection: &str,
        pagination: &Pagination,
        filter: &FilterExpression,
    ) -> Result<QueryResult> {
        let options = FindOptions::from(pagination);
        let result = self.store.find(collection, filter, &options)?;
        let documents: Vec<Document> = result
            .documents
            .into_iter()
            .map(document::normalize_id)
            .collect();

        Ok(QueryResult {
            total_count: result.total,
            returned_count: documents.len() as u64,
            documents,
        })
    }
}
