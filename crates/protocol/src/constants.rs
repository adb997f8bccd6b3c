/// Production gateway.
pub const DEFAULT_BASE_URL: &str = "https://gw.halome.cc";

/// Issues an auth token for an account.
pub const CREATE_TOKEN_ENDPOINT: &str = "/u/createToken";

/// Receives one chunk of a large-file upload.
pub const LARGE_FILE_UPLOAD_ENDPOINT: &str = "/v1/addLargeFile";

/// Receives a whole file as a multipart form.
pub const SMALL_FILE_UPLOAD_ENDPOINT: &str = "/v1/add";

/// Serves file content, honouring `Range`.
pub const FILE_DOWNLOAD_ENDPOINT: &str = "/v1/cat";

// ---------------------------------------------------------------------------
// Response codes
// ---------------------------------------------------------------------------

/// Request accepted.
pub const CODE_SUCCESS: i64 = 200;

/// Large-file upload: the chunk offset disagrees with the server's offset.
///
/// Not a hard failure. The response's `fileIndex` carries the offset the
/// server expects next.
pub const CODE_INDEX_MISMATCH: i64 = 7;

/// Describes a small-file upload error code.
///
/// Falls back to the server-provided message for codes without a known
/// meaning.
pub fn describe_small_upload_code(code: i64, server_message: &str) -> String {
    let known = match code {
        4 => "multi-file upload is not supported",
        5 => "single file must not exceed 100 MB; use the large file upload interface",
        6 => "file error",
        7 => "failed to add file to distributed storage",
        8 => "failed to write to database",
        _ => "",
    };
    if !known.is_empty() {
        known.to_string()
    } else if !server_message.is_empty() {
        server_message.to_string()
    } else {
        format!("unknown error code: {code}")
    }
}

// ---------------------------------------------------------------------------
// Header names
// ---------------------------------------------------------------------------

pub const HEADER_AUTH_TOKEN: &str = "AuthToken";
pub const HEADER_FILE_START_INDEX: &str = "FileStartIndex";
pub const HEADER_FILE_SIZE: &str = "FileSize";
pub const HEADER_FILE_NAME: &str = "FileName";
pub const HEADER_FILE_MD5: &str = "FileMd5";
pub const HEADER_NOTIFICATION_LINK: &str = "NotificationLink";
pub const HEADER_RANGE: &str = "Range";
pub const HEADER_CONTENT_RANGE: &str = "Content-Range";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

// ---------------------------------------------------------------------------
// Size limits
// ---------------------------------------------------------------------------

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Smallest chunk the upload endpoint accepts (except a file's only chunk).
pub const UPLOAD_MIN_CHUNK_SIZE: u64 = MIB;

/// Largest chunk the upload endpoint accepts.
pub const UPLOAD_MAX_CHUNK_SIZE: u64 = 10 * MIB;

pub const DOWNLOAD_MIN_CHUNK_SIZE: u64 = 64 * KIB;
pub const DOWNLOAD_MAX_CHUNK_SIZE: u64 = 10 * MIB;
pub const DOWNLOAD_DEFAULT_CHUNK_SIZE: u64 = MIB;

/// Largest file the small-file endpoint accepts (100 MiB).
pub const SMALL_FILE_MAX_SIZE: u64 = 100 * MIB;
