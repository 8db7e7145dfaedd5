use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocQueryError {
    #[error("Unable to connect to store: {0}")]
    Connection(String),

    #[error("Invalid document id: {0}")]
    InvalidId(String),

    #[error("Filter error: {0}")]
    Filter(String),

    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Cannot insert rows into {collection}: {message}")]
    Insert { collection: String, message: String },

    #[error("Import file is missing: {0}")]
    MissingFile(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DocQueryError>;
