//! Resumable, content-addressed box uploads.
//!
//! This crate holds the upload **logic** only. The registry client provides
//! an [`UploadRemote`] implementation over HTTP; callers observe a run
//! through a [`StatusSink`].
//!
//! # Pipeline
//!
//! 1. **Hash**: digest the box in fixed windows
//! 2. **Resolve**: look up the session for that digest, or create it
//! 3. **Transmit**: send the remaining bytes in order, one chunk at a time

pub mod error;
pub mod orchestrator;
pub mod remote;
pub mod resolver;
pub mod retry;
pub mod sink;
pub mod transmitter;
pub mod types;

#[cfg(test)]
mod mock;

pub use error::{RemoteError, UploadError};
pub use orchestrator::UploadOrchestrator;
pub use remote::{ChunkAck, RemoteFuture, UploadRemote};
pub use resolver::SessionResolver;
pub use retry::RetryPolicy;
pub use sink::StatusSink;
pub use transmitter::ChunkTransmitter;
pub use types::{
    ResolvedSession, TransferProgress, TransferStatus, TransmitReport, UploadEvent,
    UploadOptions, UploadOutcome, UploadRequest,
};
