//! Chunk-size planning.
//!
//! The upload endpoint rejects chunks smaller than its minimum unless the
//! chunk is the whole file. A requested size whose trailing remainder would
//! fall under the minimum is nudged up or down to a size that divides the
//! file cleanly or leaves a large enough tail.

use guangyuyun_protocol::constants::{
    DOWNLOAD_MAX_CHUNK_SIZE, DOWNLOAD_MIN_CHUNK_SIZE, UPLOAD_MAX_CHUNK_SIZE, UPLOAD_MIN_CHUNK_SIZE,
};

/// Step between candidate sizes (64 KiB).
pub const SEARCH_STEP: u64 = 64 * 1024;

/// Inclusive chunk-size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    pub min: u64,
    pub max: u64,
}

impl ChunkBounds {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, size: u64) -> bool {
        size >= self.min && size <= self.max
    }
}

/// Upload chunk bounds: 1 MiB to 10 MiB.
pub const UPLOAD_CHUNK_BOUNDS: ChunkBounds =
    ChunkBounds::new(UPLOAD_MIN_CHUNK_SIZE, UPLOAD_MAX_CHUNK_SIZE);

/// Download chunk bounds: 64 KiB to 10 MiB.
pub const DOWNLOAD_CHUNK_BOUNDS: ChunkBounds =
    ChunkBounds::new(DOWNLOAD_MIN_CHUNK_SIZE, DOWNLOAD_MAX_CHUNK_SIZE);

/// Result of [`adjust_chunk_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSizeAdjustment {
    /// The requested size already partitions the file acceptably.
    Valid(u64),
    /// A nearby size was chosen instead.
    Adjusted { original: u64, adjusted: u64 },
    /// No size within bounds avoids a short trailing chunk.
    NotFound { original: u64 },
}

impl ChunkSizeAdjustment {
    /// The size to transfer with. Falls back to the original on `NotFound`.
    pub fn chunk_size(&self) -> u64 {
        match *self {
            Self::Valid(size) => size,
            Self::Adjusted { adjusted, .. } => adjusted,
            Self::NotFound { original } => original,
        }
    }
}

/// Picks a chunk size whose trailing chunk is empty or at least `bounds.min`.
///
/// Candidates are scanned in `step` increments: first downwards from
/// `requested` to `bounds.min`, then upwards to `bounds.max`. The first hit
/// wins. A file smaller than `bounds.min` is always sent as a single chunk
/// and is reported as `Valid`.
///
/// `requested` must already lie within `bounds`.
pub fn adjust_chunk_size(
    total_size: u64,
    requested: u64,
    bounds: ChunkBounds,
    step: u64,
) -> ChunkSizeAdjustment {
    if requested == 0 || total_size < bounds.min || tail_ok(total_size, requested, bounds.min) {
        return ChunkSizeAdjustment::Valid(requested);
    }

    let step = step.max(1);
    let found = (1..)
        .map_while(|i: u64| requested.checked_sub(i.checked_mul(step)?))
        .take_while(|&candidate| candidate >= bounds.min)
        .chain(
            (1..)
                .map_while(|i: u64| requested.checked_add(i.checked_mul(step)?))
                .take_while(|&candidate| candidate <= bounds.max),
        )
        .find(|&candidate| bounds.contains(candidate) && tail_ok(total_size, candidate, bounds.min));

    match found {
        Some(adjusted) => ChunkSizeAdjustment::Adjusted {
            original: requested,
            adjusted,
        },
        None => ChunkSizeAdjustment::NotFound {
            original: requested,
        },
    }
}

fn tail_ok(total_size: u64, chunk_size: u64, min: u64) -> bool {
    let remainder = total_size % chunk_size;
    remainder == 0 || remainder >= min
}
