//! Upload engine types.

use std::fmt;
use std::sync::Arc;

use boxreg_protocol::{ChecksumType, ContentHash, FieldErrors, UploadScope, UploadSessionInfo};
use boxreg_transfer::{BoxSource, DEFAULT_CHUNK_SIZE, HASH_WINDOW_SIZE};

use crate::retry::RetryPolicy;

/// Bytes acknowledged so far out of the whole box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_loaded: u64,
    pub total_size: u64,
}

impl TransferProgress {
    pub fn new(bytes_loaded: u64, total_size: u64) -> Self {
        Self {
            bytes_loaded,
            total_size,
        }
    }

    /// Percentage in `[0, 100]`. An empty box is fully loaded.
    pub fn percentage(&self) -> f64 {
        if self.total_size == 0 {
            return 100.0;
        }
        (self.bytes_loaded.min(self.total_size) as f64 / self.total_size as f64) * 100.0
    }
}

/// State of an upload run as seen by the status sink.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferStatus {
    Idle,
    Hashing,
    Resolving,
    Transmitting(TransferProgress),
    Succeeded,
    Failed(String),
}

impl TransferStatus {
    /// Human-readable status line.
    pub fn message(&self) -> String {
        match self {
            TransferStatus::Idle => String::new(),
            TransferStatus::Hashing => "Computing file hash...".into(),
            TransferStatus::Resolving => "Resolving upload session...".into(),
            TransferStatus::Transmitting(p) => {
                format!("Uploading box... {}%", p.percentage().round() as u32)
            }
            TransferStatus::Succeeded => "Box uploaded!".into(),
            TransferStatus::Failed(reason) => format!("Upload failed: {reason}"),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Succeeded | TransferStatus::Failed(_))
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Everything an orchestrator writes to its status sink.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// State transition.
    Status(TransferStatus),
    /// Acknowledged bytes during transmission.
    Progress(TransferProgress),
    /// Validation messages keyed by form field.
    FieldErrors(FieldErrors),
    /// `true` while a run is in flight.
    Pending(bool),
}

/// Tunables for an orchestrator.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub hash_window: usize,
    pub chunk_size: u64,
    pub checksum_type: ChecksumType,
    pub retry: RetryPolicy,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            hash_window: HASH_WINDOW_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            checksum_type: ChecksumType::Md5,
            retry: RetryPolicy::default(),
        }
    }
}

/// One upload to run.
#[derive(Clone)]
pub struct UploadRequest {
    pub scope: UploadScope,
    pub source: Arc<dyn BoxSource>,
    /// Digest the box must have, when replacing a known artifact.
    pub expected_checksum: Option<ContentHash>,
}

impl UploadRequest {
    pub fn new(scope: UploadScope, source: Arc<dyn BoxSource>) -> Self {
        Self {
            scope,
            source,
            expected_checksum: None,
        }
    }

    pub fn expect_checksum(mut self, checksum: ContentHash) -> Self {
        self.expected_checksum = Some(checksum);
        self
    }
}

/// Session returned by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSession {
    pub info: UploadSessionInfo,
    /// `true` if the session did not exist and was created.
    pub created: bool,
}

/// What a transmitter did to bring the session to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransmitReport {
    pub final_offset: u64,
    pub chunks_sent: u32,
    pub bytes_sent: u64,
    /// Times the cursor was moved to a server-reported offset.
    pub offset_corrections: u32,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub checksum: ContentHash,
    pub session_created: bool,
    /// Offset the server had confirmed before this run sent anything.
    pub resumed_from: u64,
    pub chunks_sent: u32,
    pub bytes_sent: u64,
    pub offset_corrections: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percentage() {
        assert_eq!(TransferProgress::new(0, 0).percentage(), 100.0);
        assert_eq!(TransferProgress::new(5, 10).percentage(), 50.0);
        assert_eq!(TransferProgress::new(20, 10).percentage(), 100.0);
    }

    #[test]
    fn status_messages() {
        let p = TransferProgress::new(5_242_880, 12_582_912);
        assert_eq!(
            TransferStatus::Transmitting(p).message(),
            "Uploading box... 42%"
        );
        assert_eq!(TransferStatus::Succeeded.message(), "Box uploaded!");
        assert_eq!(
            TransferStatus::Failed("boom".into()).to_string(),
            "Upload failed: boom"
        );
        assert!(TransferStatus::Succeeded.is_terminal());
        assert!(!TransferStatus::Resolving.is_terminal());
    }
}
