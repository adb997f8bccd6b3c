use guangyuyun_transfer::{TransferError, TransferFailure};

/// Errors from the gateway client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("empty response from server")]
    EmptyResponse,

    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A chunked transfer stopped part way; the outcome says how far it got.
    #[error(transparent)]
    TransferFailed(#[from] TransferFailure),
}

impl ClientError {
    /// Gateway or HTTP code attached to the error, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            Self::Status { status, .. } => Some(i64::from(*status)),
            Self::Transfer(e) => e.code(),
            Self::TransferFailed(f) => f.code(),
            _ => None,
        }
    }

    /// Partial progress of a failed chunked transfer.
    pub fn outcome(&self) -> Option<&guangyuyun_transfer::TransferOutcome> {
        match self {
            Self::TransferFailed(f) => Some(&f.outcome),
            _ => None,
        }
    }
}
