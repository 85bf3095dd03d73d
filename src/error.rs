use thiserror::Error;

use crate::content::Difficulty;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("unknown book id {0}")]
    UnknownBook(u32),

    #[error("no {difficulty} excerpt for book {book_id}")]
    MissingExcerpt { book_id: u32, difficulty: Difficulty },

    #[error("library data file {file} not found")]
    MissingData { file: &'static str },

    #[error("failed to parse library data: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("stats database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not create stats directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not write csv export: {0}")]
    Csv(#[from] csv::Error),

    #[error("no data directory available for the stats database")]
    NoDataDir,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not write config: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}
