use super::matcher::{sort_documents, Matcher};
use super::{DocumentStore, FindOptions, FindResult};
use crate::config::StoreConfig;
use crate::document::{self, Document, ID_FIELD};
use crate::error::{DocQueryError, Result};
use crate::filter::FilterExpression;
use crate::value::ObjectId;
use rusqlite::{params, Connection};
use std::sync::{Mutex, MutexGuard};

/// A document store kept in SQLite, one JSON row per document.
///
/// Filters are evaluated in-process by [`Matcher`]; SQLite only provides
/// persistence and natural (insertion) order.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    namespace: String,
}

impl SqliteStore {
    /// Open the store described by `config`, creating tables as needed.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(&config.path)
        }
        .map_err(|e| {
            DocQueryError::Connection(format!("{}: {e}", config.path.display()))
        })?;
        Self::with_connection(conn, &config.database)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&StoreConfig::in_memory())
    }

    fn with_connection(conn: Connection, namespace: &str) -> Result<Self> {
        let store = SqliteStore {
            conn: Mutex::new(conn),
            namespace: namespace.to_string(),
        };
        store.initialize_tables()?;
        Ok(store)
    }

    /// The database namespace this store reads and writes.
    pub fn database(&self) -> &str {
        &self.namespace
    }

    fn initialize_tables(&self) -> Result<()> {
        self.lock()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                namespace TEXT NOT NULL,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data_json TEXT NOT NULL,
                UNIQUE (namespace, collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_collection
                ON documents(namespace, collection);
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DocQueryError::Store("connection lock poisoned".into()))
    }

    /// All documents of a collection in insertion order, with their row keys.
    fn load(&self, conn: &Connection, collection: &str) -> Result<Vec<(i64, Document)>> {
        let mut stmt = conn.prepare(
            "SELECT seq, data_json FROM documents
             WHERE namespace = ?1 AND collection = ?2
             ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![self.namespace, collection], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (seq, data_json) = row?;
            let doc: Document = serde_json::from_str(&data_json)?;
            documents.push((seq, doc));
        }
        Ok(documents)
    }

    fn matching(&self, collection: &str, filter: &FilterExpression) -> Result<Vec<Document>> {
        let matcher = Matcher::new(filter)?;
        let conn = self.lock()?;
        Ok(self
            .load(&conn, collection)?
            .into_iter()
            .map(|(_, doc)| doc)
            .filter(|doc| matcher.matches(doc))
            .collect())
    }

    fn update(
        &self,
        collection: &str,
        filter: &FilterExpression,
        fields: &Document,
        only_first: bool,
    ) -> Result<u64> {
        if fields.contains_key(ID_FIELD) {
            return Err(DocQueryError::Store(format!("{ID_FIELD} cannot be modified")));
        }
        let matcher = Matcher::new(filter)?;
        let mut conn = self.lock()?;
        let documents = self.load(&conn, collection)?;

        let tx = conn.transaction()?;
        let mut modified = 0;
        {
            let mut stmt = tx.prepare("UPDATE documents SET data_json = ?1 WHERE seq = ?2")?;
            for (seq, mut doc) in documents {
                if !matcher.matches(&doc) {
                    continue;
                }
                let before = doc.clone();
                for (path, value) in fields {
                    document::set_path(&mut doc, path, value.clone());
                }
                if doc != before {
                    stmt.execute(params![serde_json::to_string(&doc)?, seq])?;
                    modified += 1;
                }
                if only_first {
                    break;
                }
            }
        }
        tx.commit()?;
        Ok(modified)
    }
}

/// Put a fresh `_id` first when the document has none.
fn with_object_id(doc: Document) -> Result<(ObjectId, Document)> {
    match doc.get(ID_FIELD) {
        None => {
            let id = ObjectId::new();
            let mut stored = Document::with_capacity(doc.len() + 1);
            stored.insert(ID_FIELD.to_string(), id.to_json());
            stored.extend(doc);
            Ok((id, stored))
        }
        Some(value) => match ObjectId::from_json(value) {
            Some(id) => Ok((id, doc)),
            None => Err(DocQueryError::Store(format!(
                "{ID_FIELD} must be an ObjectId, got {value}"
            ))),
        },
    }
}

impl DocumentStore for SqliteStore {
    fn connect(&self) -> Result<()> {
        self.lock()?
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| DocQueryError::Connection(e.to_string()))?;
        Ok(())
    }

    fn count(&self, collection: &str, filter: &FilterExpression) -> Result<u64> {
        Ok(self.matching(collection, filter)?.len() as u64)
    }

    fn find(
        &self,
        collection: &str,
        filter: &FilterExpression,
        options: &FindOptions,
    ) -> Result<FindResult> {
        if options.skip < 0 {
            return Err(DocQueryError::Store(format!(
                "skip must be non-negative, got {}",
                options.skip
            )));
        }
        log::debug!(
            "find {}.{collection}: filter={} options={}",
            self.namespace,
            filter.to_document(),
            options.to_json()
        );

        let mut documents = self.matching(collection, filter)?;
        let total = documents.len() as u64;
        if let Some(sort) = &options.sort {
            sort_documents(&mut documents, sort);
        }

        // 0 means no limit; a negative limit is taken as its absolute value
        let limit = match options.limit {
            0 => usize::MAX,
            n => usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX),
        };
        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let documents = documents.into_iter().skip(skip).take(limit).collect();

        Ok(FindResult { total, documents })
    }

    fn find_one(&self, collection: &str, filter: &FilterExpression) -> Result<Option<Document>> {
        let matcher = Matcher::new(filter)?;
        let conn = self.lock()?;
        Ok(self
            .load(&conn, collection)?
            .into_iter()
            .map(|(_, doc)| doc)
            .find(|doc| matcher.matches(doc)))
    }

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<ObjectId>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(documents.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO documents (namespace, collection, id, data_json)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for doc in documents {
                let (id, doc) = with_object_id(doc)?;
                stmt.execute(params![
                    self.namespace,
                    collection,
                    id.to_hex(),
                    serde_json::to_string(&doc)?
                ])?;
                ids.push(id);
            }
        }
        tx.commit()?;
        log::debug!("inserted {} documents into {}.{collection}", ids.len(), self.namespace);
        Ok(ids)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &FilterExpression,
        fields: &Document,
    ) -> Result<u64> {
        self.update(collection, filter, fields, true)
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &FilterExpression,
        fields: &Document,
    ) -> Result<u64> {
        self.update(collection, filter, fields, false)
    }

    fn delete_many(&self, collection: &str, filter: &FilterExpression) -> Result<u64> {
        let matcher = Matcher::new(filter)?;
        let mut conn = self.lock()?;
        let documents = self.load(&conn, collection)?;

        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM documents WHERE seq = ?1")?;
            for (seq, doc) in &documents {
                if matcher.matches(doc) {
                    stmt.execute(params![seq])?;
                    deleted += 1;
                }
            }
        }
        tx.commit()?;
        Ok(deleted)
    }
}
