//! Wire types for the GuangYuYun storage gateway.
//!
//! Everything here is plain data: endpoint paths, header names, response
//! codes and the JSON bodies exchanged with the gateway. Transfer logic
//! lives in `guangyuyun-transfer`.

pub mod constants;
pub mod messages;
pub mod range;

// Re-export primary types for convenience.
pub use constants::{CODE_INDEX_MISMATCH, CODE_SUCCESS};
pub use messages::{
    ChunkHeaders, LargeFileUploadResponse, SmallFileUploadResponse, TokenData, TokenRequest,
    TokenResponse,
};
pub use range::{ByteRange, ContentRange, RangeError};
