//! Resumable chunked transfers against the GuangYuYun gateway.
//!
//! Uploads split a file into chunks and let the server drive the offset.
//! Downloads fetch consecutive byte ranges and append them to the output,
//! resuming from whatever is already on disk.
//!
//! The network is reached only through [`Transport`]; one call is in flight
//! at a time and each session owns its own state.

mod chunked;
mod download;
mod planner;
mod progress;
mod transport;
mod types;
mod upload;
mod validation;

pub use chunked::{ChunkReader, ChunkWriter, calculate_file_md5, md5_bytes};
pub use download::{DownloadRequest, DownloadSession, parse_total_size};
pub use planner::{
    ChunkBounds, ChunkSizeAdjustment, DOWNLOAD_CHUNK_BOUNDS, SEARCH_STEP, UPLOAD_CHUNK_BOUNDS,
    adjust_chunk_size,
};
pub use progress::{Direction, ProgressCallback, SpeedCalculator, TransferProgress};
pub use transport::{Method, Transport, TransportFuture, TransportRequest, TransportResponse};
pub use types::{
    ChunkDescriptor, DownloadState, Reconciliation, TransferFailure, TransferOutcome,
    TransferPlan, UploadState,
};
pub use upload::{
    ChunkVerdict, MAX_CONSECUTIVE_RECONCILES, UploadRequest, UploadSession, classify_response,
};
pub use validation::{require_non_blank, validate_chunk_size, validate_source_file};

/// Default upload chunk size: the smallest size the server accepts (1 MiB).
pub const DEFAULT_UPLOAD_CHUNK_SIZE: u64 = guangyuyun_protocol::constants::UPLOAD_MIN_CHUNK_SIZE;

/// Default download chunk size (1 MiB).
pub const DEFAULT_DOWNLOAD_CHUNK_SIZE: u64 =
    guangyuyun_protocol::constants::DOWNLOAD_DEFAULT_CHUNK_SIZE;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("file is empty")]
    EmptyFile,

    #[error("network error: {0}")]
    Transport(String),

    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response from server")]
    EmptyResponse,

    #[error("upload ended without a file id from the server")]
    MissingFileId,

    #[error("upload made no progress after {attempts} consecutive chunk replies")]
    ReconcileLimit { attempts: u32 },

    #[error("unable to determine file size")]
    UnknownSize,

    #[error("received empty chunk data")]
    EmptyChunk,

    #[error("task join error: {0}")]
    Task(String),
}

impl TransferError {
    /// Numeric code attached to the failure, if any.
    ///
    /// Gateway codes for server errors, the HTTP status for HTTP errors.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Server { code, .. } => Some(*code),
            Self::HttpStatus(status) => Some(i64::from(*status)),
            _ => None,
        }
    }
}
