use std::cmp::Ordering;
use std::path::PathBuf;

use serde::Serialize;

use crate::TransferError;

/// Parameters of one upload, fixed before the first chunk is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub file_name: String,
    /// Lower-case hex MD5 of the whole file.
    pub content_digest: String,
    pub total_size: u64,
    pub chunk_size: u64,
}

impl TransferPlan {
    pub fn new(
        file_name: impl Into<String>,
        content_digest: impl Into<String>,
        total_size: u64,
        chunk_size: u64,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_digest: content_digest.into(),
            total_size,
            chunk_size,
        }
    }

    /// Number of chunks the plan produces, counting a short tail.
    pub fn chunk_count(&self) -> u64 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.total_size.div_ceil(self.chunk_size)
    }
}

/// A chunk of file data for transfer.
#[derive(Debug, Clone)]
pub struct ChunkDescriptor {
    /// Byte offset within the file.
    pub offset: u64,
    /// Size of this chunk in bytes.
    pub length: u32,
    /// Raw chunk data.
    pub payload: Vec<u8>,
}

/// How the upload cursor moved after the server reported its own offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Server is ahead; the bytes in between are already stored.
    SkipForward,
    /// Server is behind; bytes must be re-sent.
    Rewind,
    /// Server agrees with the client; the same chunk is sent again.
    InPlace,
}

/// Progress of one upload. The server offset is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadState {
    pub offset: u64,
    /// 1-based number of the chunk about to be sent.
    pub chunk_number: u64,
    pub remote_file_id: Option<String>,
    pub done: bool,
}

impl Default for UploadState {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadState {
    pub fn new() -> Self {
        Self {
            offset: 0,
            chunk_number: 1,
            remote_file_id: None,
            done: false,
        }
    }

    /// A chunk was accepted; moves to the server-confirmed offset.
    pub fn advance(&mut self, next_offset: u64) {
        self.offset = next_offset;
        self.chunk_number += 1;
    }

    /// The server rejected the chunk index and reported `server_offset`.
    ///
    /// A moved cursor recomputes the chunk counter from the new offset; an
    /// agreeing server just bumps it.
    pub fn reconcile(&mut self, server_offset: u64, chunk_size: u64) -> Reconciliation {
        let direction = match server_offset.cmp(&self.offset) {
            Ordering::Greater => Reconciliation::SkipForward,
            Ordering::Less => Reconciliation::Rewind,
            Ordering::Equal => Reconciliation::InPlace,
        };
        match direction {
            Reconciliation::InPlace => self.chunk_number += 1,
            _ => {
                self.offset = server_offset;
                self.chunk_number = server_offset.checked_div(chunk_size).unwrap_or(0) + 1;
            }
        }
        direction
    }

    /// Records the remote id and ends the upload.
    pub fn complete(&mut self, remote_file_id: String) {
        self.remote_file_id = Some(remote_file_id);
        self.done = true;
    }
}

/// Progress of one download. `downloaded` is also the next range start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadState {
    pub downloaded: u64,
    pub total_size: u64,
    pub chunk_number: u64,
}

impl DownloadState {
    pub fn new(downloaded: u64, total_size: u64) -> Self {
        Self {
            downloaded,
            total_size,
            chunk_number: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.downloaded >= self.total_size
    }

    pub fn remaining(&self) -> u64 {
        self.total_size.saturating_sub(self.downloaded)
    }

    pub fn advance(&mut self, bytes: u64) {
        self.downloaded += bytes;
        self.chunk_number += 1;
    }
}

/// Summary of a finished or failed transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub success: bool,
    pub message: String,
    pub total_size: u64,
    pub transferred_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl TransferOutcome {
    pub fn succeeded(message: impl Into<String>, total_size: u64) -> Self {
        Self {
            success: true,
            message: message.into(),
            total_size,
            transferred_size: total_size,
            ..Self::default()
        }
    }

    pub fn with_remote_id(mut self, id: impl Into<String>) -> Self {
        self.remote_id = Some(id.into());
        self
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }
}

/// A failed transfer: the cause plus how far it got.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct TransferFailure {
    #[source]
    pub error: TransferError,
    pub outcome: TransferOutcome,
}

impl TransferFailure {
    pub fn new(error: TransferError, total_size: u64, transferred_size: u64) -> Self {
        let outcome = TransferOutcome {
            success: false,
            message: error.to_string(),
            total_size,
            transferred_size,
            ..TransferOutcome::default()
        };
        Self { error, outcome }
    }

    /// Failure that happened before any byte moved.
    pub fn early(error: TransferError) -> Self {
        Self::new(error, 0, 0)
    }

    /// Server or HTTP code of the cause, if any.
    pub fn code(&self) -> Option<i64> {
        self.error.code()
    }
}
