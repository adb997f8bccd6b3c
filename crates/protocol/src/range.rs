//! HTTP byte-range helpers for ranged downloads.
//!
//! ```text
//! Range:         bytes=<start>-<end>          (request, inclusive)
//! Content-Range: bytes <start>-<end>/<total>  (response)
//!                bytes */<total>              (unsatisfiable)
//!                bytes <start>-<end>/*        (unknown total)
//! ```

/// Errors from parsing a `Content-Range` value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("unsupported range unit: {0}")]
    Unit(String),

    #[error("malformed content range: {0}")]
    Malformed(String),
}

/// Inclusive byte range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// The range starting at `offset` spanning at most `chunk_size` bytes,
    /// clipped to `total_size - 1`.
    ///
    /// Returns `None` when `offset` is already past the end or `chunk_size` is 0.
    pub fn clipped(offset: u64, chunk_size: u64, total_size: u64) -> Option<Self> {
        if chunk_size == 0 || offset >= total_size {
            return None;
        }
        let end = offset.saturating_add(chunk_size - 1).min(total_size - 1);
        Some(Self { start: offset, end })
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Range` request header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Parsed `Content-Range` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// `None` for the unsatisfiable form (`bytes */total`).
    pub range: Option<ByteRange>,
    /// `None` when the server reports `*`.
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn parse(value: &str) -> Result<Self, RangeError> {
        let value = value.trim();
        let (unit, rest) = value
            .split_once(' ')
            .ok_or_else(|| RangeError::Malformed(value.to_string()))?;
        if !unit.eq_ignore_ascii_case("bytes") {
            return Err(RangeError::Unit(unit.to_string()));
        }

        let (span, total) = rest
            .trim()
            .split_once('/')
            .ok_or_else(|| RangeError::Malformed(value.to_string()))?;

        let total = match total.trim() {
            "*" => None,
            t => Some(
                t.parse::<u64>()
                    .map_err(|_| RangeError::Malformed(value.to_string()))?,
            ),
        };

        let range = match span.trim() {
            "*" => None,
            s => {
                let (start, end) = s
                    .split_once('-')
                    .ok_or_else(|| RangeError::Malformed(value.to_string()))?;
                let start = start
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| RangeError::Malformed(value.to_string()))?;
                let end = end
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| RangeError::Malformed(value.to_string()))?;
                if end < start {
                    return Err(RangeError::Malformed(value.to_string()));
                }
                Some(ByteRange { start, end })
            }
        };

        Ok(Self { range, total })
    }
}
