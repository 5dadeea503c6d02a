//! Local side of a box upload: reading, hashing and chunking.
//!
//! Nothing in here talks to the network. The upload engine borrows a
//! [`BoxSource`], hashes it with [`HashComputer`] and slices it into
//! [`Chunk`]s following the server-confirmed offset.

mod chunked;
mod hash;
mod progress;
mod source;
mod validation;

pub use chunked::{Chunk, read_chunk};
pub use hash::HashComputer;
pub use progress::SpeedCalculator;
pub use source::{BoxSource, InMemorySource, LocalBoxFile, ReadFuture};
pub use validation::{BOX_EXTENSION, validate_box_file_name};

/// Default hashing window: 2 MiB.
pub const HASH_WINDOW_SIZE: usize = 2 * 1024 * 1024;

/// Default upload chunk size: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cancelled")]
    Cancelled,

    #[error("unsupported checksum type: {0}")]
    UnsupportedChecksum(boxreg_protocol::ChecksumType),

    #[error("not a box file: {0}")]
    InvalidFileName(String),
}
