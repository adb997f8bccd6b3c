use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use tokio::io::AsyncWriteExt;

use crate::TransferError;
use crate::types::ChunkDescriptor;

/// Read buffer for whole-file digests.
const DIGEST_BUFFER_SIZE: usize = 8192;

// ---------------------------------------------------------------------------
// Digest helpers
// ---------------------------------------------------------------------------

/// Computes MD5 of `data` and returns the lower-case hex digest.
pub fn md5_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Computes MD5 of an entire file, streaming it through a fixed buffer.
pub fn calculate_file_md5(path: &Path) -> Result<String, TransferError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; DIGEST_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a file in chunks starting at an arbitrary offset.
pub struct ChunkReader {
    file: std::fs::File,
    chunk_size: u64,
    offset: u64,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    pub fn new(path: &Path, chunk_size: u64) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::Validation("chunk size must be positive".into()));
        }
        let file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();
        Ok(Self {
            file,
            chunk_size,
            offset: 0,
            file_size,
        })
    }

    /// Moves the read position. The next chunk starts exactly here.
    pub fn seek_to(&mut self, offset: u64) -> Result<(), TransferError> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// Reads up to `chunk_size` bytes at the current offset. Returns `None` at EOF.
    pub fn next_chunk(&mut self) -> Result<Option<ChunkDescriptor>, TransferError> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = remaining.min(self.chunk_size);
        let mut payload = Vec::with_capacity(read_size as usize);
        (&mut self.file).take(read_size).read_to_end(&mut payload)?;
        if payload.is_empty() {
            return Ok(None);
        }

        let chunk = ChunkDescriptor {
            offset: self.offset,
            length: payload.len() as u32,
            payload,
        };
        self.offset += u64::from(chunk.length);
        Ok(Some(chunk))
    }

    fn remaining(&self) -> u64 {
        self.file_size.saturating_sub(self.offset)
    }
}

// ---------------------------------------------------------------------------
// ChunkWriter
// ---------------------------------------------------------------------------

/// Writes consecutive chunks to a single output file.
///
/// The chunk at offset 0 creates or truncates the file; every other chunk is
/// appended. Chunks must arrive in order: each one starts where the previous
/// one ended.
pub struct ChunkWriter {
    path: PathBuf,
    file: Option<tokio::fs::File>,
    written: u64,
}

impl ChunkWriter {
    /// Creates a writer whose next chunk is expected at `resume_from`.
    pub fn new(path: &Path, resume_from: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
            written: resume_from,
        }
    }

    /// Writes `data` located at `offset` in the remote object.
    pub async fn write_chunk(&mut self, offset: u64, data: &[u8]) -> Result<(), TransferError> {
        if offset != self.written {
            return Err(TransferError::Validation(format!(
                "out-of-order chunk: expected offset {}, got {offset}",
                self.written
            )));
        }

        if self.file.is_none() {
            let file = if offset == 0 {
                tokio::fs::File::create(&self.path).await?
            } else {
                tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .await?
            };
            self.file = Some(file);
        }

        if let Some(file) = self.file.as_mut() {
            file.write_all(data).await?;
            // Partial output must survive a failed run so it can be resumed.
            file.flush().await?;
        }
        self.written += data.len() as u64;
        Ok(())
    }
}
