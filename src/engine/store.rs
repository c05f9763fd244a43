use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::model::*;

pub type SharedMentorState = Arc<RwLock<MentorState>>;

/// Booking records plus one lockable calendar per mentor.
///
/// Records are readable without any mentor lock. Writers hold the owning
/// mentor's write lock while they decide and apply, which is what keeps two
/// accepts for the same mentor from both passing the conflict check.
pub struct BookingStore {
    records: DashMap<BookingId, Booking>,
    mentors: DashMap<MentorId, SharedMentorState>,
}

impl Default for BookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            mentors: DashMap::new(),
        }
    }

    /// Rebuild a store from journal events.
    pub fn recover(events: &[Event]) -> Self {
        let store = Self::new();
        let mut calendars: HashMap<MentorId, MentorState> = HashMap::new();
        for event in events {
            let mentor_id = event.mentor_id();
            let ms = calendars
                .entry(mentor_id)
                .or_insert_with(|| MentorState::new(mentor_id));
            store.apply_event(ms, event);
        }
        for (mentor_id, ms) in calendars {
            store.mentors.insert(mentor_id, Arc::new(RwLock::new(ms)));
        }
        store
    }

    // ── Records ──────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &BookingId) -> Option<Booking> {
        self.records.get(id).map(|e| e.value().clone())
    }

    pub fn mentor_of(&self, id: &BookingId) -> Option<MentorId> {
        self.records.get(id).map(|e| e.value().mentor_id)
    }

    /// All records matching `filter`, in store order unless `filter.sorted`.
    pub fn list(&self, filter: &BookingFilter) -> Vec<Booking> {
        let mut out: Vec<Booking> = self
            .records
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        if filter.sorted {
            sort_by_start(&mut out);
        }
        out
    }

    /// A mentor's bookings via the per-mentor index instead of a full scan.
    pub async fn list_for_mentor(
        &self,
        mentor_id: MentorId,
        status: Option<BookingStatus>,
    ) -> Vec<Booking> {
        let Some(ms) = self.get_mentor_state(&mentor_id) else {
            return Vec::new();
        };
        let guard = ms.read().await;
        guard
            .bookings
            .iter()
            .filter_map(|id| self.get(id))
            .filter(|b| status.is_none_or(|s| b.status == s))
            .collect()
    }

    pub fn count_by_status(&self) -> HashMap<BookingStatus, usize> {
        let mut counts: HashMap<BookingStatus, usize> =
            BookingStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for entry in self.records.iter() {
            *counts.entry(entry.value().status).or_default() += 1;
        }
        counts
    }

    // ── Mentor calendars ─────────────────────────────────────

    pub fn get_mentor_state(&self, mentor_id: &MentorId) -> Option<SharedMentorState> {
        self.mentors.get(mentor_id).map(|e| e.value().clone())
    }

    /// Get the mentor's calendar, creating an empty one on first use.
    pub fn mentor_state(&self, mentor_id: MentorId) -> SharedMentorState {
        self.mentors
            .entry(mentor_id)
            .or_insert_with(|| Arc::new(RwLock::new(MentorState::new(mentor_id))))
            .value()
            .clone()
    }

    // ── Event application ────────────────────────────────────

    /// Apply one event. The caller holds the write lock on `ms`, which must
    /// be the calendar of `event.mentor_id()`.
    pub fn apply_event(&self, ms: &mut MentorState, event: &Event) {
        debug_assert_eq!(ms.mentor_id, event.mentor_id());
        match event {
            Event::BookingCreated { booking } => {
                if booking.status == BookingStatus::Accepted {
                    ms.insert_window(Window {
                        booking_id: booking.id,
                        span: booking.window(),
                    });
                }
                ms.bookings.push(booking.id);
                self.records.insert(booking.id, booking.clone());
            }
            Event::StatusChanged { id, status, at, .. } => {
                let Some(mut record) = self.records.get_mut(id) else {
                    return;
                };
                let was = record.status;
                record.status = *status;
                record.updated_at = *at;
                let span = record.window();
                drop(record);

                if *status == BookingStatus::Accepted {
                    ms.insert_window(Window { booking_id: *id, span });
                } else if was == BookingStatus::Accepted {
                    ms.remove_window(*id);
                }
            }
            Event::BookingDeleted { id, .. } => {
                self.records.remove(id);
                ms.bookings.retain(|b| b != id);
                ms.remove_window(*id);
            }
        }
    }

    /// The smallest event list that recreates the current records: one
    /// `BookingCreated` per booking, carrying its current status.
    pub fn snapshot_events(&self) -> Vec<Event> {
        let mut bookings: Vec<Booking> = self.records.iter().map(|e| e.value().clone()).collect();
        bookings.sort_by_key(|b| b.id);
        bookings
            .into_iter()
            .map(|booking| Event::BookingCreated { booking })
            .collect()
    }
}

pub fn sort_by_start(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| {
        a.proposed_start
            .cmp(&b.proposed_start)
            .then_with(|| a.id.cmp(&b.id))
    });
}
