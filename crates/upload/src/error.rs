//! Upload error types.

use boxreg_protocol::{ChecksumType, ContentHash, FieldErrors};
use boxreg_transfer::TransferError;

/// Field-level message for a file that is not a box.
pub const BOX_ONLY_MESSAGE: &str = "Only '*.box' files can be uploaded.";

/// Field-level message for a file whose digest differs from the expected one.
pub const CHECKSUM_MISMATCH_MESSAGE: &str =
    "Checksum of selected file doesn't match the original one. Please select original file.";

/// Failures reported by an [`UploadRemote`](crate::UploadRemote).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    /// Connection, TLS or timeout failure; no response was received.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("validation failed: {}", summarize(.0))]
    Validation(FieldErrors),

    /// The server holds a different offset than the one the chunk assumed.
    #[error("range conflict, server offset is {offset}: {detail}")]
    RangeConflict { offset: u64, detail: String },

    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether another attempt may succeed without any change on our side.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transport(_) => true,
            RemoteError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            _ => false,
        }
    }
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that end an upload run.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported checksum type: {0}")]
    UnsupportedChecksum(ChecksumType),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("gave up after {attempts} consecutive failures: {last}")]
    RetriesExhausted { attempts: u32, last: RemoteError },

    #[error("server reported offset {offset} beyond file size {size}")]
    InvalidOffset { offset: u64, size: u64 },

    #[error("session expects {remote} bytes but the local file has {local}")]
    SessionMismatch { local: u64, remote: u64 },

    #[error("checksum {actual} does not match expected {expected}")]
    ChecksumMismatch {
        expected: ContentHash,
        actual: ContentHash,
    },

    #[error("{0}: only '*.box' files can be uploaded")]
    InvalidFile(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<TransferError> for UploadError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Io(e) => UploadError::Io(e),
            TransferError::Cancelled => UploadError::Cancelled,
            TransferError::UnsupportedChecksum(t) => UploadError::UnsupportedChecksum(t),
            TransferError::InvalidFileName(name) => UploadError::InvalidFile(name),
        }
    }
}

impl UploadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UploadError::Cancelled)
    }

    /// Field-scoped messages to show next to the form inputs, if any.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        let single = |message: &str| {
            let mut errors = FieldErrors::new();
            errors.insert("file".to_string(), vec![message.to_string()]);
            errors
        };
        match self {
            UploadError::Remote(RemoteError::Validation(errors)) => Some(errors.clone()),
            UploadError::InvalidFile(_) => Some(single(BOX_ONLY_MESSAGE)),
            UploadError::ChecksumMismatch { .. } => Some(single(CHECKSUM_MISMATCH_MESSAGE)),
            _ => None,
        }
    }
}
