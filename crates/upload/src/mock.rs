//! Scripted [`UploadRemote`] and recording sink shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use boxreg_protocol::{
    ChecksumType, ContentHash, CreateUploadRequest, SessionStatus, UploadScope,
    UploadSessionInfo,
};
use boxreg_transfer::Chunk;
use tokio::sync::Notify;

use crate::error::RemoteError;
use crate::remote::{ChunkAck, RemoteFuture, UploadRemote};
use crate::sink::StatusSink;
use crate::types::UploadEvent;

/// Scripted reply to one chunk request. Requests past the script are accepted.
#[derive(Debug, Clone)]
pub enum ChunkReply {
    Accept,
    /// Accept but report a different offset than the chunk end.
    AcceptAt(u64),
    Fail(RemoteError),
}

/// Blocks the first `fetch_session` (or `upload_chunk`) call until released.
#[derive(Default)]
pub struct Hold {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct MockRemote {
    pub session: Mutex<Option<UploadSessionInfo>>,
    pub fetch_errors: Mutex<VecDeque<RemoteError>>,
    pub create_error: Mutex<Option<RemoteError>>,
    pub chunk_replies: Mutex<VecDeque<ChunkReply>>,
    pub ranges: Mutex<Vec<String>>,
    pub created: Mutex<Vec<CreateUploadRequest>>,
    pub fetch_calls: AtomicUsize,
    pub hold: Mutex<Option<std::sync::Arc<Hold>>>,
    pub chunk_hold: Mutex<Option<std::sync::Arc<Hold>>>,
}

impl MockRemote {
    pub fn with_session(file_size: u64, offset: u64) -> Self {
        let remote = Self::default();
        *remote.session.lock().unwrap() = Some(session(file_size, offset));
        remote
    }

    pub fn script(&self, replies: impl IntoIterator<Item = ChunkReply>) {
        self.chunk_replies.lock().unwrap().extend(replies);
    }

    pub fn ranges(&self) -> Vec<String> {
        self.ranges.lock().unwrap().clone()
    }

    pub fn chunk_calls(&self) -> usize {
        self.ranges.lock().unwrap().len()
    }

    pub fn create_calls(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

pub fn session(file_size: u64, offset: u64) -> UploadSessionInfo {
    UploadSessionInfo {
        url: None,
        id: None,
        file_size,
        offset,
        checksum: ContentHash::parse("00").unwrap(),
        checksum_type: ChecksumType::Md5,
        status: Some(if offset == 0 {
            SessionStatus::Started
        } else if offset >= file_size {
            SessionStatus::Completed
        } else {
            SessionStatus::InProgress
        }),
        date_expires: None,
    }
}

impl UploadRemote for MockRemote {
    fn fetch_session<'a>(
        &'a self,
        _scope: &'a UploadScope,
        checksum: &'a ContentHash,
    ) -> RemoteFuture<'a, Option<UploadSessionInfo>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().unwrap().take();
        Box::pin(async move {
            if let Some(hold) = hold {
                hold.entered.notify_one();
                hold.release.notified().await;
            }
            if let Some(err) = self.fetch_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(self.session.lock().unwrap().clone().map(|mut s| {
                s.checksum = checksum.clone();
                s
            }))
        })
    }

    fn create_session<'a>(
        &'a self,
        _scope: &'a UploadScope,
        request: &'a CreateUploadRequest,
    ) -> RemoteFuture<'a, UploadSessionInfo> {
        self.created.lock().unwrap().push(request.clone());
        Box::pin(async move {
            if let Some(err) = self.create_error.lock().unwrap().take() {
                return Err(err);
            }
            let mut info = session(request.file_size, 0);
            info.checksum = request.checksum.clone();
            *self.session.lock().unwrap() = Some(info.clone());
            Ok(info)
        })
    }

    fn upload_chunk<'a>(
        &'a self,
        _scope: &'a UploadScope,
        _checksum: &'a ContentHash,
        chunk: Chunk,
    ) -> RemoteFuture<'a, ChunkAck> {
        self.ranges.lock().unwrap().push(chunk.range.header_value());
        let reply = self
            .chunk_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ChunkReply::Accept);
        let hold = self.chunk_hold.lock().unwrap().take();
        Box::pin(async move {
            if let Some(hold) = hold {
                hold.entered.notify_one();
                hold.release.notified().await;
            }
            let offset = match reply {
                ChunkReply::Accept => chunk.range.next_offset(),
                ChunkReply::AcceptAt(offset) => offset,
                ChunkReply::Fail(err) => return Err(err),
            };
            if let Some(s) = self.session.lock().unwrap().as_mut() {
                s.offset = offset;
            }
            Ok(ChunkAck {
                offset: Some(offset),
            })
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<UploadEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<UploadEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingSink {
    fn publish(&self, event: UploadEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn transport() -> RemoteError {
    RemoteError::Transport("connection reset".into())
}

pub fn scope() -> UploadScope {
    UploadScope::new("hashicorp", "precise64", "1.0.0", "virtualbox")
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8).collect()
}
