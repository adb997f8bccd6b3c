//! GuangYuYun gateway client.
//!
//! [`Client`] wraps token issuance, small-file upload, and the resumable
//! chunked transfers from `guangyuyun-transfer`, all over one `reqwest`
//! connection pool.

mod client;
mod config;
mod error;
mod http;

pub use client::{Client, DownloadOptions, UploadOptions};
pub use config::{ClientConfig, ConfigError, default_path};
pub use error::ClientError;
pub use http::HttpTransport;

pub use guangyuyun_protocol::{SmallFileUploadResponse, TokenRequest, TokenResponse};
pub use guangyuyun_transfer::{
    Direction, ProgressCallback, TransferFailure, TransferOutcome, TransferProgress,
};
