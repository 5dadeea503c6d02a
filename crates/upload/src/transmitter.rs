use boxreg_protocol::{ContentHash, ContentRange, UploadScope};
use boxreg_transfer::{BoxSource, DEFAULT_CHUNK_SIZE, read_chunk};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{RemoteError, UploadError};
use crate::remote::UploadRemote;
use crate::retry::RetryPolicy;
use crate::types::{TransferProgress, TransmitReport};

/// Drives a session's offset up to the file size.
///
/// Chunks go out one at a time in increasing offset order. The cursor only
/// moves on an acknowledgment or to an offset the server reported.
pub struct ChunkTransmitter<'a> {
    remote: &'a dyn UploadRemote,
    chunk_size: u64,
    retry: &'a RetryPolicy,
}

impl<'a> ChunkTransmitter<'a> {
    /// A zero `chunk_size` falls back to [`DEFAULT_CHUNK_SIZE`].
    pub fn new(remote: &'a dyn UploadRemote, chunk_size: u64, retry: &'a RetryPolicy) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            remote,
            chunk_size,
            retry,
        }
    }

    /// Sends `[offset, source.len())` and returns once the server holds every
    /// byte. `on_progress` is called after every acknowledgment and cursor
    /// correction.
    pub async fn transmit<F>(
        &self,
        scope: &UploadScope,
        checksum: &ContentHash,
        source: &dyn BoxSource,
        offset: u64,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<TransmitReport, UploadError>
    where
        F: FnMut(TransferProgress) + Send,
    {
        let total = source.len();
        if offset > total {
            return Err(UploadError::InvalidOffset {
                offset,
                size: total,
            });
        }

        let mut report = TransmitReport {
            final_offset: offset,
            ..TransmitReport::default()
        };
        let mut cursor = offset;
        let mut failures = 0u32;

        while let Some(range) = ContentRange::window(cursor, self.chunk_size, total) {
            check(cancel)?;
            let chunk = read_chunk(source, range).await?;
            check(cancel)?;

            debug!(range = %range, attempt = failures + 1, "sending chunk");
            let len = chunk.len() as u64;
            let result = self.remote.upload_chunk(scope, checksum, chunk).await;
            check(cancel)?;

            match result {
                Ok(ack) => {
                    failures = 0;
                    report.chunks_sent += 1;
                    report.bytes_sent += len;
                    cursor = match ack.offset {
                        Some(server) if server != range.next_offset() => {
                            if server > total {
                                return Err(UploadError::InvalidOffset {
                                    offset: server,
                                    size: total,
                                });
                            }
                            warn!(
                                range = %range,
                                offset = server,
                                "acknowledgment moved the offset"
                            );
                            report.offset_corrections += 1;
                            server
                        }
                        _ => range.next_offset(),
                    };
                    on_progress(TransferProgress::new(cursor, total));
                }
                Err(RemoteError::RangeConflict {
                    offset: server,
                    detail,
                }) => {
                    failures += 1;
                    if server > total {
                        return Err(UploadError::InvalidOffset {
                            offset: server,
                            size: total,
                        });
                    }
                    warn!(range = %range, offset = server, %detail, "range conflict, resyncing");
                    cursor = server;
                    report.offset_corrections += 1;
                    on_progress(TransferProgress::new(cursor, total));
                    if cursor < total && self.retry.exhausted(failures) {
                        return Err(UploadError::RetriesExhausted {
                            attempts: failures,
                            last: RemoteError::RangeConflict {
                                offset: server,
                                detail,
                            },
                        });
                    }
                }
                Err(err) if err.is_transient() => {
                    failures += 1;
                    if self.retry.exhausted(failures) {
                        return Err(UploadError::RetriesExhausted {
                            attempts: failures,
                            last: err,
                        });
                    }
                    let delay = self.retry.delay_for_attempt(failures);
                    warn!(
                        range = %range,
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "chunk failed, retrying"
                    );
                    if !self.retry.backoff(failures, cancel).await {
                        return Err(UploadError::Cancelled);
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        report.final_offset = cursor;
        Ok(report)
    }
}

fn check(cancel: &CancellationToken) -> Result<(), UploadError> {
    if cancel.is_cancelled() {
        Err(UploadError::Cancelled)
    } else {
        Ok(())
    }
}
