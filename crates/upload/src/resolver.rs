use boxreg_protocol::{ChecksumType, ContentHash, CreateUploadRequest, UploadScope};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::UploadError;
use crate::remote::UploadRemote;
use crate::types::ResolvedSession;

/// Finds the upload session for a digest, creating it when there is none.
///
/// One call makes one lookup and at most one create; retrying transient
/// failures is left to the caller.
pub struct SessionResolver<'a> {
    remote: &'a dyn UploadRemote,
    checksum_type: ChecksumType,
}

impl<'a> SessionResolver<'a> {
    pub fn new(remote: &'a dyn UploadRemote, checksum_type: ChecksumType) -> Self {
        Self {
            remote,
            checksum_type,
        }
    }

    pub async fn resolve(
        &self,
        scope: &UploadScope,
        checksum: &ContentHash,
        size: u64,
        cancel: &CancellationToken,
    ) -> Result<ResolvedSession, UploadError> {
        if let Some(info) = self.remote.fetch_session(scope, checksum).await? {
            if info.file_size != size {
                return Err(UploadError::SessionMismatch {
                    local: size,
                    remote: info.file_size,
                });
            }
            if info.offset > info.file_size {
                return Err(UploadError::InvalidOffset {
                    offset: info.offset,
                    size,
                });
            }
            info!(
                %scope,
                %checksum,
                offset = info.offset,
                remaining = info.remaining(),
                complete = info.is_complete(),
                "resuming upload session"
            );
            return Ok(ResolvedSession {
                info,
                created: false,
            });
        }

        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        debug!(%scope, %checksum, "no upload session, creating one");
        let request = CreateUploadRequest {
            checksum: checksum.clone(),
            checksum_type: self.checksum_type,
            file_size: size,
        };
        let info = self.remote.create_session(scope, &request).await?;
        if info.offset > size {
            return Err(UploadError::InvalidOffset {
                offset: info.offset,
                size,
            });
        }
        info!(%scope, %checksum, size, "created upload session");
        Ok(ResolvedSession {
            info,
            created: true,
        })
    }
}
