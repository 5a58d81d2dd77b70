//! Error types for the smellsolver core library.

/// Top-level error enum for the smellsolver core library.
#[derive(Debug, thiserror::Error)]
pub enum SmellError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Hosting error: {0}")]
    Hosting(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SmellResult<T> = Result<T, SmellError>;
