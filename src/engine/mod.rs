mod conflict;
mod error;
mod lifecycle;
mod mutations;
mod queries;
mod store;

pub use conflict::{find_conflict, has_conflict};
pub use error::{EngineError, Entity, ErrorKind};
pub use lifecycle::{is_allowed, transition};
pub use store::{BookingStore, SharedMentorState, sort_by_start};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, OwnedRwLockWriteGuard};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{DEFAULT_COMPACT_THRESHOLD, EngineConfig};
use crate::lookup::Collaborators;
use crate::model::*;
use crate::wal::Wal;

/// The booking service: validates requests against the collaborators, runs
/// them through the lifecycle rules, and commits them to the journal and store.
pub struct Engine {
    store: BookingStore,
    wal: Mutex<Wal>,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
    compact_threshold: u64,
}

impl Engine {
    /// Open the journal at `wal_path`, replaying it into a fresh store. A torn
    /// or corrupt tail is cut off before the journal is reopened for appends.
    pub fn new(
        wal_path: PathBuf,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
    ) -> io::Result<Self> {
        if let Some(dir) = wal_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let events = Wal::recover(&wal_path)?;
        let store = BookingStore::recover(&events);
        info!(
            "replayed {} journal events into {} bookings from {}",
            events.len(),
            store.len(),
            wal_path.display()
        );
        let wal = Wal::open(&wal_path)?;

        Ok(Self {
            store,
            wal: Mutex::new(wal),
            collaborators,
            clock,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        })
    }

    /// Open using the configured data directory, threshold and system clock.
    pub fn from_config(config: &EngineConfig, collaborators: Collaborators) -> io::Result<Self> {
        Ok(Self::new(config.wal_path(), collaborators, Arc::new(SystemClock))?
            .with_compact_threshold(config.compact_threshold))
    }

    pub fn with_compact_threshold(mut self, threshold: u64) -> Self {
        self.compact_threshold = threshold;
        self
    }

    pub fn store(&self) -> &BookingStore {
        &self.store
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Journal append + apply under the journal lock. The caller holds the
    /// mentor's write lock. On append failure nothing is applied.
    pub(super) async fn persist_and_apply(
        &self,
        ms: &mut MentorState,
        event: &Event,
    ) -> Result<(), EngineError> {
        let mut wal = self.wal.lock().await;
        let started = Instant::now();
        wal.append(event)
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        metrics::histogram!(crate::observability::WAL_APPEND_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        self.store.apply_event(ms, event);
        Ok(())
    }

    /// Lock the calendar of the booking's mentor, then re-read the booking
    /// under that lock so decisions see the latest committed state.
    pub(super) async fn lock_booking(
        &self,
        id: BookingId,
    ) -> Result<(OwnedRwLockWriteGuard<MentorState>, Booking), EngineError> {
        let not_found = || EngineError::NotFound(Entity::Booking(id));
        let mentor_id = self.store.mentor_of(&id).ok_or_else(not_found)?;
        let guard = self.store.mentor_state(mentor_id).write_owned().await;
        let booking = self.store.get(&id).ok_or_else(not_found)?;
        Ok((guard, booking))
    }

    /// Rewrite the journal as one record per live booking.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut wal = self.wal.lock().await;
        // Holding the journal lock freezes the store: every apply happens under it.
        let events = self.store.snapshot_events();
        wal.compact(&events)
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        metrics::counter!(crate::observability::WAL_COMPACTIONS_TOTAL).increment(1);
        info!(
            "compacted journal {} to {} events",
            wal.path().display(),
            events.len()
        );
        Ok(())
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        self.wal.lock().await.appends_since_compact()
    }

    /// Compact once the journal has grown past the threshold. Call with no
    /// mentor lock held. Failure is logged, not surfaced: the write that
    /// triggered it has already been committed.
    pub(super) async fn maybe_compact(&self) {
        if self.compact_threshold == 0
            || self.wal_appends_since_compact().await < self.compact_threshold
        {
            return;
        }
        if let Err(e) = self.compact_wal().await {
            warn!("journal compaction failed: {e}");
        }
    }
}
