use chrono::Months;

use crate::limits::BOOKING_HORIZON_MONTHS;
use crate::model::*;

use super::EngineError;

/// First confirmed window overlapping `[start, end)`, skipping `exclude`.
pub fn find_conflict<'a, I>(
    start: Timestamp,
    end: Timestamp,
    confirmed: I,
    exclude: Option<BookingId>,
) -> Option<BookingId>
where
    I: IntoIterator<Item = &'a Window>,
{
    let candidate = Span { start, end };
    confirmed
        .into_iter()
        .filter(|w| exclude != Some(w.booking_id))
        .find(|w| w.span.overlaps(&candidate))
        .map(|w| w.booking_id)
}

pub fn has_conflict<'a, I>(
    start: Timestamp,
    end: Timestamp,
    confirmed: I,
    exclude: Option<BookingId>,
) -> bool
where
    I: IntoIterator<Item = &'a Window>,
{
    find_conflict(start, end, confirmed, exclude).is_some()
}

/// A proposed start must be strictly after `now` and no later than the
/// booking horizon.
pub(crate) fn validate_proposed_start(
    proposed_start: Timestamp,
    now: Timestamp,
) -> Result<(), EngineError> {
    if proposed_start <= now {
        return Err(EngineError::InvalidArgument(
            "proposed start must be in the future".into(),
        ));
    }
    let horizon = now
        .checked_add_months(Months::new(BOOKING_HORIZON_MONTHS))
        .ok_or_else(|| EngineError::InvalidArgument("timestamp out of range".into()))?;
    if proposed_start > horizon {
        return Err(EngineError::InvalidArgument(format!(
            "proposed start cannot be more than {BOOKING_HORIZON_MONTHS} months in the future"
        )));
    }
    Ok(())
}

pub(crate) fn validate_duration(task_id: TaskId, minutes: i64) -> Result<u32, EngineError> {
    use crate::limits::MAX_TASK_DURATION_MINUTES;
    match u32::try_from(minutes) {
        Ok(m) if m > 0 && m <= MAX_TASK_DURATION_MINUTES => Ok(m),
        _ => Err(EngineError::InvalidArgument(format!(
            "task {task_id} has unusable duration of {minutes} minutes"
        ))),
    }
}
