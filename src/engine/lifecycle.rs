//! Which status changes are legal, and who may make them.
//!
//! ```text
//! Pending  ──accept (mentor)──▶ Accepted ──cancel (either)──▶ Cancelled
//!    │  └──decline (mentor)──▶ Declined
//!    └────cancel (either)────▶ Cancelled
//! ```
//!
//! Creation into `Pending` is handled by the orchestrator; nothing re-enters it.

use crate::model::*;

use super::EngineError;

/// Who may request a move into a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parties {
    Mentor,
    Either,
}

fn parties_for(to: BookingStatus) -> Option<Parties> {
    match to {
        BookingStatus::Accepted | BookingStatus::Declined => Some(Parties::Mentor),
        BookingStatus::Cancelled => Some(Parties::Either),
        BookingStatus::Pending => None,
    }
}

/// The transition table. Anything not listed is forbidden.
pub fn is_allowed(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    matches!(
        (from, to),
        (Pending, Accepted) | (Pending, Declined) | (Pending, Cancelled) | (Accepted, Cancelled)
    )
}

fn is_party(booking: &Booking, caller: Actor, parties: Parties) -> bool {
    match (caller, parties) {
        (Actor::Mentor(id), _) => id == booking.mentor_id,
        (Actor::Student(id), Parties::Either) => id == booking.student_id,
        (Actor::Student(_), Parties::Mentor) => false,
    }
}

/// Check that `caller` may move `booking` to `to`, returning the new status.
///
/// Ownership is checked before the table, so a stranger always sees
/// `PermissionDenied` regardless of the booking's current status.
pub fn transition(
    booking: &Booking,
    to: BookingStatus,
    caller: Actor,
) -> Result<BookingStatus, EngineError> {
    let from = booking.status;
    let Some(parties) = parties_for(to) else {
        return Err(EngineError::InvalidTransition { from, to });
    };
    if !is_party(booking, caller, parties) {
        return Err(EngineError::PermissionDenied {
            booking: booking.id,
            caller,
        });
    }
    if !is_allowed(from, to) {
        return Err(EngineError::InvalidTransition { from, to });
    }
    Ok(to)
}
