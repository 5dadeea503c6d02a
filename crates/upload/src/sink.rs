//! Status sink and the per-run write gate in front of it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::UploadError;
use crate::types::{TransferStatus, UploadEvent};

/// Write-only observer of upload runs.
///
/// Implementations must not block; `publish` is called while the gate lock
/// is held.
pub trait StatusSink: Send + Sync {
    fn publish(&self, event: UploadEvent);
}

impl StatusSink for mpsc::Sender<UploadEvent> {
    fn publish(&self, event: UploadEvent) {
        if let Err(e) = self.try_send(event) {
            warn!(error = %e, "dropping upload event");
        }
    }
}

impl StatusSink for mpsc::UnboundedSender<UploadEvent> {
    fn publish(&self, event: UploadEvent) {
        if let Err(e) = self.send(event) {
            warn!(error = %e, "dropping upload event");
        }
    }
}

/// Serializes sink writes and tracks which run is the latest.
pub(crate) struct SinkGate {
    sink: Arc<dyn StatusSink>,
    generation: AtomicU64,
    lock: Mutex<()>,
}

impl SinkGate {
    pub(crate) fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self {
            sink,
            generation: AtomicU64::new(0),
            lock: Mutex::new(()),
        }
    }

    /// Starts a new run, invalidating every older one.
    pub(crate) fn begin(&self) -> u64 {
        let _held = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn latest(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Invalidates the current run and reports the orchestrator idle.
    pub(crate) fn reset(&self) {
        let _held = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.sink.publish(UploadEvent::Status(TransferStatus::Idle));
        self.sink.publish(UploadEvent::Pending(false));
    }

    fn publish_if(&self, run: u64, cancel: &CancellationToken, event: UploadEvent) -> bool {
        let _held = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if cancel.is_cancelled() || self.generation.load(Ordering::SeqCst) != run {
            return false;
        }
        self.sink.publish(event);
        true
    }
}

/// Identity of one orchestrator run.
///
/// Every sink write goes through the guard and is dropped once the run is
/// cancelled or superseded.
pub(crate) struct RunGuard {
    id: u64,
    cancel: CancellationToken,
    gate: Arc<SinkGate>,
}

impl RunGuard {
    pub(crate) fn new(id: u64, cancel: CancellationToken, gate: Arc<SinkGate>) -> Self {
        Self { id, cancel, gate }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn is_current(&self) -> bool {
        !self.cancel.is_cancelled() && self.gate.latest() == self.id
    }

    pub(crate) fn check(&self) -> Result<(), UploadError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(UploadError::Cancelled)
        }
    }

    pub(crate) fn publish(&self, event: UploadEvent) -> bool {
        self.gate.publish_if(self.id, &self.cancel, event)
    }

    pub(crate) fn status(&self, status: TransferStatus) -> bool {
        self.publish(UploadEvent::Status(status))
    }
}
