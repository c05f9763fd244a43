use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;

/// Naive wall-clock instant. All times share one assumed zone.
pub type Timestamp = NaiveDateTime;

pub type StudentId = u64;
pub type MentorId = u64;
pub type TaskId = u64;
pub type BookingId = Ulid;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Span {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn from_minutes(start: Timestamp, minutes: u32) -> Self {
        Self::new(start, start + Duration::minutes(i64::from(minutes)))
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Back-to-back spans (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::Declined,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Declined => "declined",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Declined | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EngineError::InvalidArgument("status is required".into()));
        }
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                EngineError::InvalidArgument(format!(
                    "invalid status {s:?}; must be one of: pending, accepted, declined, cancelled"
                ))
            })
    }
}

/// Which side of a booking a caller claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Mentor,
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "mentor" => Ok(Role::Mentor),
            _ => Err(EngineError::InvalidArgument(format!("invalid role: {s:?}"))),
        }
    }
}

/// A caller identity, already bound to its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Student(StudentId),
    Mentor(MentorId),
}

impl Actor {
    pub fn new(role: Role, id: u64) -> Self {
        match role {
            Role::Student => Actor::Student(id),
            Role::Mentor => Actor::Mentor(id),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Student(id) => write!(f, "student {id}"),
            Actor::Mentor(id) => write!(f, "mentor {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub student_id: StudentId,
    pub mentor_id: MentorId,
    pub task_id: TaskId,
    pub proposed_start: Timestamp,
    /// Copied from the task at creation; later task edits do not apply.
    pub duration_minutes: u32,
    pub status: BookingStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Booking {
    pub fn end_time(&self) -> Timestamp {
        self.window().end
    }

    /// The interval this booking occupies on its mentor's calendar.
    pub fn window(&self) -> Span {
        Span::from_minutes(self.proposed_start, self.duration_minutes)
    }
}

/// An accepted booking's slot on its mentor's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub booking_id: BookingId,
    pub span: Span,
}

/// Per-mentor state guarded by one lock: every booking the mentor holds plus
/// the calendar of accepted windows used for conflict detection.
#[derive(Debug, Clone)]
pub struct MentorState {
    pub mentor_id: MentorId,
    pub bookings: Vec<BookingId>,
    /// Accepted windows, sorted by `span.start`.
    pub accepted: Vec<Window>,
}

impl MentorState {
    pub fn new(mentor_id: MentorId) -> Self {
        Self {
            mentor_id,
            bookings: Vec::new(),
            accepted: Vec::new(),
        }
    }

    /// Insert window maintaining sort order by span.start.
    pub fn insert_window(&mut self, window: Window) {
        let pos = self
            .accepted
            .binary_search_by_key(&window.span.start, |w| w.span.start)
            .unwrap_or_else(|e| e);
        self.accepted.insert(pos, window);
    }

    pub fn remove_window(&mut self, booking_id: BookingId) -> Option<Window> {
        let pos = self.accepted.iter().position(|w| w.booking_id == booking_id)?;
        Some(self.accepted.remove(pos))
    }

    /// Accepted windows whose span overlaps the query.
    /// Windows starting at or after `query.end` are skipped by binary search.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Window> {
        let right_bound = self
            .accepted
            .partition_point(|w| w.span.start < query.end);
        self.accepted[..right_bound]
            .iter()
            .filter(move |w| w.span.end > query.start)
    }
}

/// Criteria for listing bookings. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub student_id: Option<StudentId>,
    pub mentor_id: Option<MentorId>,
    pub task_id: Option<TaskId>,
    pub status: Option<BookingStatus>,
    /// Sort by `proposed_start` instead of store order.
    pub sorted: bool,
}

impl BookingFilter {
    pub fn student(id: StudentId) -> Self {
        Self { student_id: Some(id), ..Self::default() }
    }

    pub fn mentor(id: MentorId) -> Self {
        Self { mentor_id: Some(id), ..Self::default() }
    }

    pub fn task(id: TaskId) -> Self {
        Self { task_id: Some(id), ..Self::default() }
    }

    pub fn status(status: BookingStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn sorted(mut self) -> Self {
        self.sorted = true;
        self
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.student_id.is_none_or(|id| booking.student_id == id)
            && self.mentor_id.is_none_or(|id| booking.mentor_id == id)
            && self.task_id.is_none_or(|id| booking.task_id == id)
            && self.status.is_none_or(|s| booking.status == s)
    }
}

/// Journal record format. Flat, one variant per mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        booking: Booking,
    },
    StatusChanged {
        id: BookingId,
        mentor_id: MentorId,
        status: BookingStatus,
        at: Timestamp,
    },
    BookingDeleted {
        id: BookingId,
        mentor_id: MentorId,
    },
}

impl Event {
    pub fn mentor_id(&self) -> MentorId {
        match self {
            Event::BookingCreated { booking } => booking.mentor_id,
            Event::StatusChanged { mentor_id, .. } | Event::BookingDeleted { mentor_id, .. } => {
                *mentor_id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2030, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn window(start: Timestamp, minutes: u32) -> Window {
        Window {
            booking_id: Ulid::new(),
            span: Span::from_minutes(start, minutes),
        }
    }

    #[test]
    fn span_from_minutes() {
        let s = Span::from_minutes(at(10, 0), 45);
        assert_eq!(s.end, at(10, 45));
        assert_eq!(s.duration(), Duration::minutes(45));
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(at(10, 0), at(10, 45));
        let b = Span::new(at(10, 30), at(11, 15));
        let c = Span::new(at(10, 45), at(11, 30));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // back-to-back
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn span_contained_overlaps() {
        let outer = Span::new(at(9, 0), at(12, 0));
        let inner = Span::new(at(10, 0), at(10, 15));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("pending".parse::<BookingStatus>().unwrap(), BookingStatus::Pending);
        assert_eq!("ACCEPTED".parse::<BookingStatus>().unwrap(), BookingStatus::Accepted);
        assert_eq!(" Declined ".parse::<BookingStatus>().unwrap(), BookingStatus::Declined);
        assert_eq!("cancelled".parse::<BookingStatus>().unwrap(), BookingStatus::Cancelled);
    }

    #[test]
    fn status_rejects_unknown_and_empty() {
        assert!(matches!(
            "confirmed".parse::<BookingStatus>(),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            "   ".parse::<BookingStatus>(),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn status_terminality() {
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Accepted.is_terminal());
        assert!(BookingStatus::Declined.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&BookingStatus::Accepted).unwrap();
        assert_eq!(json, "\"accepted\"");
    }

    #[test]
    fn role_parsing() {
        assert_eq!("Student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!("mentor".parse::<Role>().unwrap(), Role::Mentor);
        assert!(matches!("admin".parse::<Role>(), Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn booking_window_and_end_time() {
        let b = Booking {
            id: Ulid::new(),
            student_id: 1,
            mentor_id: 2,
            task_id: 3,
            proposed_start: at(10, 0),
            duration_minutes: 45,
            status: BookingStatus::Pending,
            created_at: at(8, 0),
            updated_at: at(8, 0),
        };
        assert_eq!(b.window(), Span::new(at(10, 0), at(10, 45)));
        assert_eq!(b.end_time(), at(10, 45));
    }

    #[test]
    fn accepted_windows_stay_sorted() {
        let mut ms = MentorState::new(1);
        ms.insert_window(window(at(14, 0), 30));
        ms.insert_window(window(at(9, 0), 30));
        ms.insert_window(window(at(11, 0), 30));
        let starts: Vec<_> = ms.accepted.iter().map(|w| w.span.start).collect();
        assert_eq!(starts, vec![at(9, 0), at(11, 0), at(14, 0)]);
    }

    #[test]
    fn remove_window_by_booking() {
        let mut ms = MentorState::new(1);
        let w = window(at(9, 0), 30);
        ms.insert_window(w);
        ms.insert_window(window(at(10, 0), 30));
        assert_eq!(ms.remove_window(w.booking_id), Some(w));
        assert_eq!(ms.accepted.len(), 1);
        assert!(ms.remove_window(Ulid::new()).is_none());
    }

    #[test]
    fn overlapping_prunes_by_range() {
        let mut ms = MentorState::new(1);
        ms.insert_window(window(at(8, 0), 60)); // ends before query
        ms.insert_window(window(at(9, 30), 60)); // overlaps
        ms.insert_window(window(at(11, 0), 60)); // starts at query end
        let query = Span::new(at(10, 0), at(11, 0));
        let hits: Vec<_> = ms.overlapping(&query).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span.start, at(9, 30));
    }

    #[test]
    fn overlapping_long_window_spanning_query() {
        let mut ms = MentorState::new(1);
        ms.insert_window(window(at(6, 0), 8 * 60));
        let query = Span::new(at(10, 0), at(10, 30));
        assert_eq!(ms.overlapping(&query).count(), 1);
    }

    #[test]
    fn filter_matches_all_criteria() {
        let b = Booking {
            id: Ulid::new(),
            student_id: 1,
            mentor_id: 2,
            task_id: 3,
            proposed_start: at(10, 0),
            duration_minutes: 30,
            status: BookingStatus::Accepted,
            created_at: at(8, 0),
            updated_at: at(8, 0),
        };
        assert!(BookingFilter::default().matches(&b));
        assert!(BookingFilter::mentor(2).with_status(BookingStatus::Accepted).matches(&b));
        assert!(!BookingFilter::mentor(2).with_status(BookingStatus::Pending).matches(&b));
        assert!(!BookingFilter::student(9).matches(&b));
        assert!(BookingFilter::task(3).matches(&b));
    }
}
