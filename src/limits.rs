/// Latest a booking may be proposed, in calendar months from now.
pub const BOOKING_HORIZON_MONTHS: u32 = 6;

/// Bookings (any status) a single mentor may hold in the store.
pub const MAX_BOOKINGS_PER_MENTOR: usize = 10_000;

/// Longest session a task may define. Anything above this is treated as a
/// broken catalog entry rather than a real session.
pub const MAX_TASK_DURATION_MINUTES: u32 = 24 * 60;
