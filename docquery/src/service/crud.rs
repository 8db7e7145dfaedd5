// Bulk inserts through a collection service

use super::CollectionService;
use crate::document::Document;
use crate::error::{DocQueryError, Result};
use crate::store::DocumentStore;
use crate::value::ObjectId;

/// Writes rows into a collection in one batch.
pub struct CrudService<S> {
    collections: CollectionService<S>,
}

impl<S: DocumentStore> CrudService<S> {
    pub fn new(store: S) -> Self {
        CrudService {
            collections: CollectionService::new(store),
        }
    }

    pub fn collections(&self) -> &CollectionService<S> {
        &self.collections
    }

    /// Insert `rows` into `collection`, returning the identifiers in input order.
    ///
    /// A failed connection is reported as such; any other store failure becomes
    /// [`DocQueryError::Insert`].
    pub fn add_rows(&self, collection: &str, rows: Vec<Document>) -> Result<Vec<ObjectId>> {
        self.collections.ensure_connected()?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let count = rows.len();
        let ids = self
            .collections
            .store()
            .insert_many(collection, rows)
            .map_err(|e| DocQueryError::Insert {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;
        log::info!("inserted {count} rows into {collection}");
        Ok(ids)
    }
}
