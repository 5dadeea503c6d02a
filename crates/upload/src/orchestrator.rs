//! Upload orchestrator: hash, resolve, transmit as one cancellable run.
//!
//! One run is active per orchestrator. Starting a new upload supersedes the
//! running one; the old run stops at its next suspension point and never
//! writes to the sink again.

use std::sync::{Arc, Mutex};

use boxreg_protocol::{ContentHash, UploadScope};
use boxreg_transfer::{HashComputer, validate_box_file_name};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::UploadError;
use crate::remote::UploadRemote;
use crate::resolver::SessionResolver;
use crate::sink::{RunGuard, SinkGate, StatusSink};
use crate::transmitter::ChunkTransmitter;
use crate::types::{
    ResolvedSession, TransferProgress, TransferStatus, UploadEvent, UploadOptions,
    UploadOutcome, UploadRequest,
};

/// Sequences hashing, session resolution and chunk transmission.
pub struct UploadOrchestrator {
    remote: Arc<dyn UploadRemote>,
    gate: Arc<SinkGate>,
    options: UploadOptions,
    active: Mutex<Option<(u64, CancellationToken)>>,
}

impl UploadOrchestrator {
    pub fn new(
        remote: Arc<dyn UploadRemote>,
        sink: Arc<dyn StatusSink>,
        options: UploadOptions,
    ) -> Self {
        Self {
            remote,
            gate: Arc::new(SinkGate::new(sink)),
            options,
            active: Mutex::new(None),
        }
    }

    /// Id of the most recent run; 0 before the first one.
    pub fn latest_run(&self) -> u64 {
        self.gate.latest()
    }

    /// Cancels the active run, if any, and reports idle.
    pub fn cancel(&self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((_, token)) = active.take() {
            token.cancel();
        }
        self.gate.reset();
        debug!(run = self.gate.latest(), "upload cancelled");
    }

    /// Runs one upload to completion.
    ///
    /// Any run still in flight is cancelled first.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, UploadError> {
        let cancel = CancellationToken::new();
        let run = {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if let Some((previous, token)) = active.take() {
                debug!(run = previous, "superseding upload run");
                token.cancel();
            }
            let run = self.gate.begin();
            *active = Some((run, cancel.clone()));
            run
        };
        let guard = RunGuard::new(run, cancel.clone(), self.gate.clone());

        info!(run, scope = %request.scope, file = request.source.name(), "upload started");
        guard.publish(UploadEvent::Pending(true));

        let result = self.run(&guard, request).await;

        match &result {
            Ok(outcome) => {
                guard.status(TransferStatus::Succeeded);
                info!(
                    run,
                    checksum = %outcome.checksum,
                    chunks = outcome.chunks_sent,
                    bytes = outcome.bytes_sent,
                    "upload succeeded"
                );
            }
            Err(e) if e.is_cancelled() => {
                debug!(run, "upload run stopped");
            }
            Err(e) => {
                if let Some(fields) = e.field_errors() {
                    guard.publish(UploadEvent::FieldErrors(fields));
                }
                guard.status(TransferStatus::Failed(e.to_string()));
                error!(run, error = %e, "upload failed");
            }
        }
        guard.publish(UploadEvent::Pending(false));

        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if active.as_ref().is_some_and(|(id, _)| *id == run) {
            *active = None;
        }
        drop(active);

        // A run that lost to cancel() or a newer run reports cancellation
        // whatever it was doing when it noticed.
        match result {
            Err(e) if !e.is_cancelled() && !guard.is_current() => Err(UploadError::Cancelled),
            other => other,
        }
    }

    async fn run(
        &self,
        guard: &RunGuard,
        request: UploadRequest,
    ) -> Result<UploadOutcome, UploadError> {
        let UploadRequest {
            scope,
            source,
            expected_checksum,
        } = request;
        let size = source.len();

        validate_box_file_name(source.name())?;

        guard.check()?;
        guard.status(TransferStatus::Hashing);
        let checksum = HashComputer::new(self.options.checksum_type)
            .with_window_size(self.options.hash_window)
            .compute(source.as_ref(), guard.token())
            .await?;

        if let Some(expected) = expected_checksum
            && expected != checksum
        {
            return Err(UploadError::ChecksumMismatch {
                expected,
                actual: checksum,
            });
        }

        guard.check()?;
        guard.status(TransferStatus::Resolving);
        let resolved = self.resolve(guard, &scope, &checksum, size).await?;
        let resumed_from = resolved.info.offset;

        guard.check()?;
        guard.status(TransferStatus::Transmitting(TransferProgress::new(
            resumed_from,
            size,
        )));
        let report = ChunkTransmitter::new(
            self.remote.as_ref(),
            self.options.chunk_size,
            &self.options.retry,
        )
        .transmit(
            &scope,
            &checksum,
            source.as_ref(),
            resumed_from,
            guard.token(),
            |progress| {
                guard.publish(UploadEvent::Progress(progress));
            },
        )
        .await?;

        Ok(UploadOutcome {
            checksum,
            session_created: resolved.created,
            resumed_from,
            chunks_sent: report.chunks_sent,
            bytes_sent: report.bytes_sent,
            offset_corrections: report.offset_corrections,
        })
    }

    /// Resolves the session, retrying transient failures with backoff.
    async fn resolve(
        &self,
        guard: &RunGuard,
        scope: &UploadScope,
        checksum: &ContentHash,
        size: u64,
    ) -> Result<ResolvedSession, UploadError> {
        let retry = &self.options.retry;
        let resolver = SessionResolver::new(self.remote.as_ref(), self.options.checksum_type);
        let mut failures = 0u32;

        loop {
            guard.check()?;
            match resolver.resolve(scope, checksum, size, guard.token()).await {
                Err(UploadError::Remote(err)) if err.is_transient() => {
                    failures += 1;
                    if retry.exhausted(failures) {
                        return Err(UploadError::RetriesExhausted {
                            attempts: failures,
                            last: err,
                        });
                    }
                    warn!(
                        run = guard.id(),
                        attempt = failures,
                        error = %err,
                        "session lookup failed, retrying"
                    );
                    if !retry.backoff(failures, guard.token()).await {
                        return Err(UploadError::Cancelled);
                    }
                }
                other => return other,
            }
        }
    }
}
