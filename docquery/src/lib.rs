pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod pattern;
pub mod service;
pub mod store;
pub mod value;

pub use config::StoreConfig;
pub use document::Document;
pub use error::{DocQueryError, Result};
pub use filter::{FilterBuilder, FilterExpression};
pub use pagination::{validate_pagination, Pagination, PaginationRequest, SortSpec};
pub use service::{CollectionService, CrudService, ImporterService, QueryResult};
pub use store::{DocumentStore, SqliteStore};
pub use value::{ObjectId, RegexPattern, Value};
