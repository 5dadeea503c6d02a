use boxreg_protocol::{ChecksumType, ContentHash};
use md5::Md5;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{BoxSource, HASH_WINDOW_SIZE, TransferError};

enum Hasher {
    Md5(Md5),
    Sha256(Sha256),
}

impl Hasher {
    fn new(checksum_type: ChecksumType) -> Result<Self, TransferError> {
        match checksum_type {
            ChecksumType::Md5 => Ok(Self::Md5(Md5::new())),
            ChecksumType::Sha256 => Ok(Self::Sha256(Sha256::new())),
            other => Err(TransferError::UnsupportedChecksum(other)),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
        }
    }

    fn finish(self) -> ContentHash {
        match self {
            Self::Md5(h) => ContentHash::from_digest(&h.finalize()),
            Self::Sha256(h) => ContentHash::from_digest(&h.finalize()),
        }
    }
}

/// Streams a box through a digest one window at a time.
///
/// Each window is read and folded in before the next one is requested, so
/// memory stays bounded by the window size whatever the file size is. The
/// result does not depend on the window size.
#[derive(Debug, Clone, Copy)]
pub struct HashComputer {
    window_size: usize,
    checksum_type: ChecksumType,
}

impl Default for HashComputer {
    fn default() -> Self {
        Self::new(ChecksumType::Md5)
    }
}

impl HashComputer {
    pub fn new(checksum_type: ChecksumType) -> Self {
        Self {
            window_size: HASH_WINDOW_SIZE,
            checksum_type,
        }
    }

    /// Overrides the window size. Zero keeps the default.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        if window_size > 0 {
            self.window_size = window_size;
        }
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn checksum_type(&self) -> ChecksumType {
        self.checksum_type
    }

    /// Hashes the whole source.
    pub async fn compute(
        &self,
        source: &dyn BoxSource,
        cancel: &CancellationToken,
    ) -> Result<ContentHash, TransferError> {
        self.compute_with_progress(source, cancel, |_| {}).await
    }

    /// Hashes the whole source, calling `on_window` with the number of bytes
    /// digested so far after every window.
    ///
    /// Cancellation is checked before each window read.
    pub async fn compute_with_progress<F>(
        &self,
        source: &dyn BoxSource,
        cancel: &CancellationToken,
        mut on_window: F,
    ) -> Result<ContentHash, TransferError>
    where
        F: FnMut(u64) + Send,
    {
        let mut hasher = Hasher::new(self.checksum_type)?;
        let total = source.len();
        let mut position = 0u64;

        while position < total {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            let len = (total - position).min(self.window_size as u64) as usize;
            let window = source.read_range(position, len).await?;
            hasher.update(&window);
            position += len as u64;
            on_window(position);
        }

        let hash = hasher.finish();
        debug!(
            file = source.name(),
            size = total,
            checksum_type = %self.checksum_type,
            checksum = %hash,
            "hashed box"
        );
        Ok(hash)
    }
}
