//! Stream synchronizer implementation.

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{CompositeFrame, EmissionPolicy, FrameSnapshot, OrientationHint, SensorSample};
use tracing::{instrument, warn};

/// Pending frame state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No axis observed since start or last flush
    Idle,
    /// Some but not all axes present
    Partial,
    /// All three axes present (retain policy only, between updates)
    Complete,
}

/// Synchronizer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Samples merged into the pending frame
    pub samples_ingested: u64,
    /// Snapshots emitted
    pub frames_emitted: u64,
    /// Samples refused (non-finite values)
    pub samples_rejected: u64,
}

#[derive(Debug, Default)]
struct Inner {
    frame: CompositeFrame,
    stats: SyncStats,
}

/// Cross-axis stream synchronizer
///
/// One instance per pipeline. Every method takes `&self`; slot mutation and
/// the completeness decision happen inside one critical section, so a
/// completion is emitted exactly once even when several adapters ingest
/// concurrently.
#[derive(Debug)]
pub struct StreamSynchronizer {
    policy: EmissionPolicy,
    inner: Mutex<Inner>,
}

impl StreamSynchronizer {
    /// Create a synchronizer with the given emission policy
    pub fn new(policy: EmissionPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Emission policy
    pub fn policy(&self) -> EmissionPolicy {
        self.policy
    }

    /// Merge one sample into the pending frame
    ///
    /// Returns a snapshot when the frame is complete after the merge. Under
    /// [`EmissionPolicy::Flush`] the axis slots are cleared after emission;
    /// under [`EmissionPolicy::Retain`] they are kept and every later update
    /// emits again.
    #[instrument(
        level = "trace",
        name = "sync_engine_ingest",
        skip(self, sample),
        fields(axis = %sample.axis, timestamp = sample.timestamp)
    )]
    pub fn ingest(&self, sample: SensorSample) -> Option<FrameSnapshot> {
        let mut inner = self.lock();

        if !sample.is_finite() {
            inner.stats.samples_rejected += 1;
            warn!(
                axis = %sample.axis,
                timestamp = sample.timestamp,
                "Rejected sample with non-finite values"
            );
            return None;
        }

        *inner.frame.slot_mut(sample.axis) = Some(sample.values);
        inner.frame.timestamp = sample.timestamp;
        inner.stats.samples_ingested += 1;
        metrics::counter!("sync_samples_ingested_total", "axis" => sample.axis.as_str())
            .increment(1);

        let snapshot = inner.frame.snapshot()?;

        if self.policy == EmissionPolicy::Flush {
            inner.frame.clear_axes();
        }
        inner.stats.frames_emitted += 1;
        metrics::counter!("sync_frames_emitted_total", "policy" => self.policy.as_str())
            .increment(1);

        Some(snapshot)
    }

    /// Store a device orientation hint
    ///
    /// Does not affect completeness or the pending timestamp; the hint rides
    /// along with the next emitted snapshot.
    pub fn ingest_hint(&self, hint: OrientationHint) {
        if hint.values.iter().all(|v| v.is_finite()) {
            self.lock().frame.orientation_hint = Some(hint.values);
        }
    }

    /// Copy of the pending frame
    pub fn pending(&self) -> CompositeFrame {
        self.lock().frame
    }

    /// Current pending state
    pub fn state(&self) -> SyncState {
        let inner = self.lock();
        let frame = &inner.frame;
        if frame.is_complete() {
            SyncState::Complete
        } else if frame.gyro.is_none() && frame.accel.is_none() && frame.mag.is_none() {
            SyncState::Idle
        } else {
            SyncState::Partial
        }
    }

    /// Drop the pending frame (counters are kept)
    pub fn reset(&self) {
        self.lock().frame = CompositeFrame::default();
    }

    /// Counters snapshot
    pub fn stats(&self) -> SyncStats {
        self.lock().stats
    }

    /// Lock the state, recovering from a poisoned mutex
    ///
    /// The pending frame is plain data and stays consistent even if a
    /// holder panicked.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StreamSynchronizer {
    fn default() -> Self {
        Self::new(EmissionPolicy::default())
    }
}
