//! The remote upload-session resource.
//!
//! `UploadRemote` is implemented by the registry client over HTTP. Keeping
//! it a trait lets the upload logic run against scripted mocks.

use std::future::Future;
use std::pin::Pin;

use boxreg_protocol::{ContentHash, CreateUploadRequest, UploadScope, UploadSessionInfo};
use boxreg_transfer::Chunk;

use crate::error::RemoteError;

/// Boxed future returned by [`UploadRemote`] operations.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// Acknowledgment of an accepted chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkAck {
    /// Offset the server reports after storing the chunk, if it reported one.
    pub offset: Option<u64>,
}

/// Abstract upload-session endpoint.
pub trait UploadRemote: Send + Sync {
    /// Looks up the session for `checksum`. `Ok(None)` means there is none.
    fn fetch_session<'a>(
        &'a self,
        scope: &'a UploadScope,
        checksum: &'a ContentHash,
    ) -> RemoteFuture<'a, Option<UploadSessionInfo>>;

    /// Creates a session. A fresh session starts at offset 0.
    fn create_session<'a>(
        &'a self,
        scope: &'a UploadScope,
        request: &'a CreateUploadRequest,
    ) -> RemoteFuture<'a, UploadSessionInfo>;

    /// Sends one chunk to the session for `checksum`.
    fn upload_chunk<'a>(
        &'a self,
        scope: &'a UploadScope,
        checksum: &'a ContentHash,
        chunk: Chunk,
    ) -> RemoteFuture<'a, ChunkAck>;
}
