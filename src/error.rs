use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuddyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not enough transaction data for training: got {found}, need at least {required}")]
    InsufficientData { found: usize, required: usize },

    #[error("No trained category model is available; run `buddy train` first")]
    ModelUnavailable,

    #[error("Could not find an amount in: {0:?}")]
    ParseAmbiguous(String),

    #[error("Insight unavailable: {0}")]
    InsightUnavailable(String),

    #[error("Model storage failure: {0}")]
    StorageFailure(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, BuddyError>;
