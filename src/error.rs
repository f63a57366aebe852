use thiserror::Error;

/// Everything that can go wrong between the upload form and the database.
///
/// `Upstream` is the only variant a user is expected to see: `/process`
/// renders it as an error card. The rest surface as plain HTTP errors.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("{var} not set in environment or .env")]
    MissingConfig { var: &'static str },

    #[error("invalid value for {var}: {reason}")]
    InvalidConfig { var: &'static str, reason: String },

    #[error("Typless returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("request to Typless failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response from Typless: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
