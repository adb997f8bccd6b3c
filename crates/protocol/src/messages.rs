use serde::{Deserialize, Serialize};

use crate::constants::{
    CODE_INDEX_MISMATCH, CODE_SUCCESS, HEADER_AUTH_TOKEN, HEADER_FILE_MD5, HEADER_FILE_NAME,
    HEADER_FILE_SIZE, HEADER_FILE_START_INDEX, HEADER_NOTIFICATION_LINK,
};

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// Requests a new auth token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub account: String,
    pub api_key: String,
    /// Expiry as a unix timestamp in seconds.
    pub expire_time: i64,
}

impl TokenRequest {
    pub fn new(account: impl Into<String>, api_key: impl Into<String>, expire_time: i64) -> Self {
        Self {
            account: account.into(),
            api_key: api_key.into(),
            expire_time,
        }
    }
}

/// Token payload. The gateway returns either the bare token or an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenData {
    Plain(String),
    #[serde(rename_all = "camelCase")]
    Detailed {
        token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expire_time: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TokenData>,
}

impl TokenResponse {
    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }

    /// Returns the issued token, whichever shape the gateway used.
    pub fn token(&self) -> Option<&str> {
        match &self.data {
            Some(TokenData::Plain(token)) => Some(token),
            Some(TokenData::Detailed { token, .. }) => Some(token),
            None => None,
        }
    }

    pub fn expire_time(&self) -> Option<i64> {
        match &self.data {
            Some(TokenData::Detailed { expire_time, .. }) => *expire_time,
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Small file upload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmallFileUploadResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    /// Remote file ID on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl SmallFileUploadResponse {
    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }

    pub fn file_id(&self) -> Option<&str> {
        self.data.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Large file upload
// ---------------------------------------------------------------------------

/// Per-chunk metadata sent as request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeaders {
    pub file_start_index: u64,
    pub file_size: u64,
    pub file_name: String,
    /// Hex MD5 of the whole file.
    pub file_md5: String,
    pub auth_token: String,
    pub notification_link: Option<String>,
}

impl ChunkHeaders {
    /// Returns the headers in wire order. Blank notification links are omitted.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (
                HEADER_FILE_START_INDEX.to_string(),
                self.file_start_index.to_string(),
            ),
            (HEADER_FILE_SIZE.to_string(), self.file_size.to_string()),
            (HEADER_FILE_NAME.to_string(), self.file_name.clone()),
            (HEADER_FILE_MD5.to_string(), self.file_md5.clone()),
            (HEADER_AUTH_TOKEN.to_string(), self.auth_token.clone()),
        ];
        if let Some(link) = self
            .notification_link
            .as_deref()
            .filter(|l| !l.trim().is_empty())
        {
            pairs.push((HEADER_NOTIFICATION_LINK.to_string(), link.to_string()));
        }
        pairs
    }
}

/// Response to one large-file chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargeFileUploadResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    /// Byte offset the server holds, encoded as a decimal string.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number::deserialize"
    )]
    pub file_index: Option<String>,
    /// Remote file ID; empty until the final chunk is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl LargeFileUploadResponse {
    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }

    pub fn is_index_mismatch(&self) -> bool {
        self.code == CODE_INDEX_MISMATCH
    }

    /// Parsed `fileIndex`. `None` if absent, blank, or not an integer.
    pub fn server_offset(&self) -> Option<u64> {
        self.file_index
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
    }

    /// Non-blank remote file ID.
    pub fn remote_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn is_upload_complete(&self) -> bool {
        self.is_success() && self.remote_id().is_some()
    }
}

/// Accepts `"123"` as well as `123` for fields the gateway documents as strings.
mod string_or_number {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let raw = Option::<Raw>::deserialize(deserializer)?;
        Ok(raw.map(|r| match r {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        }))
    }
}
