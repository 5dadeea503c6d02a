//! Wire types shared between the upload engine and the registry client.
//!
//! Everything here is plain data: session payloads, the `Content-Range`
//! header and the error body the registry returns on non-2xx responses.

mod messages;
mod range;
mod types;

pub use messages::{ApiErrorBody, CreateUploadRequest, FieldErrors, GENERIC_ERROR_MESSAGE};
pub use range::ContentRange;
pub use types::{ChecksumType, ContentHash, SessionStatus, UploadScope, UploadSessionInfo};

/// Errors produced while parsing protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid box tag {0:?}, expected owner/name")]
    InvalidTag(String),

    #[error("invalid checksum: {0:?}")]
    InvalidChecksum(String),

    #[error("unknown checksum type: {0}")]
    UnknownChecksumType(String),
}
