use std::time::Instant;

use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::limits::MAX_BOOKINGS_PER_MENTOR;
use crate::model::*;
use crate::observability;

use super::conflict::{find_conflict, validate_duration, validate_proposed_start};
use super::lifecycle::transition;
use super::{Engine, EngineError, Entity};

impl Engine {
    /// Propose a session. The new booking is `Pending`; overlapping pending
    /// proposals are allowed because exclusivity is only enforced on accept.
    pub async fn create_booking(
        &self,
        student_id: StudentId,
        mentor_id: MentorId,
        task_id: TaskId,
        proposed_start: Timestamp,
    ) -> Result<Booking, EngineError> {
        let started = Instant::now();
        let result = self
            .create_booking_inner(student_id, mentor_id, task_id, proposed_start)
            .await;
        self.finish_write("create", started, result).await
    }

    async fn create_booking_inner(
        &self,
        student_id: StudentId,
        mentor_id: MentorId,
        task_id: TaskId,
        proposed_start: Timestamp,
    ) -> Result<Booking, EngineError> {
        if !self.collaborators.students.exists(student_id).await {
            return Err(EngineError::NotFound(Entity::Student(student_id)));
        }
        if !self.collaborators.mentors.exists(mentor_id).await {
            return Err(EngineError::NotFound(Entity::Mentor(mentor_id)));
        }
        let minutes = self
            .collaborators
            .tasks
            .duration_minutes(task_id)
            .await
            .ok_or(EngineError::NotFound(Entity::Task(task_id)))?;
        if !self.collaborators.mentors.owns_task(mentor_id, task_id).await {
            return Err(EngineError::InvalidArgument(format!(
                "task {task_id} does not belong to mentor {mentor_id}"
            )));
        }
        let now = self.clock.now();
        validate_proposed_start(proposed_start, now)?;
        let duration_minutes = validate_duration(task_id, minutes)?;

        let ms = self.store.mentor_state(mentor_id);
        let mut guard = ms.write().await;
        if guard.bookings.len() >= MAX_BOOKINGS_PER_MENTOR {
            return Err(EngineError::LimitExceeded("too many bookings for mentor"));
        }

        let booking = Booking {
            id: Ulid::new(),
            student_id,
            mentor_id,
            task_id,
            proposed_start,
            duration_minutes,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let event = Event::BookingCreated { booking: booking.clone() };
        self.persist_and_apply(&mut guard, &event).await?;
        info!(
            "booking {} created: student {student_id} with mentor {mentor_id} at {proposed_start} for {duration_minutes}m",
            booking.id
        );
        Ok(booking)
    }

    /// Confirm a pending booking. Fails with `Conflict` if its window overlaps
    /// any other accepted booking of the same mentor.
    pub async fn accept_booking(
        &self,
        id: BookingId,
        caller: MentorId,
    ) -> Result<Booking, EngineError> {
        let started = Instant::now();
        let result = self.accept_booking_inner(id, caller).await;
        self.finish_write("accept", started, result).await
    }

    async fn accept_booking_inner(
        &self,
        id: BookingId,
        caller: MentorId,
    ) -> Result<Booking, EngineError> {
        let (mut guard, booking) = self.lock_booking(id).await?;
        let status = transition(&booking, BookingStatus::Accepted, Actor::Mentor(caller))?;

        let window = booking.window();
        if let Some(with) = find_conflict(
            window.start,
            window.end,
            guard.overlapping(&window),
            Some(id),
        ) {
            metrics::counter!(observability::CONFLICTS_TOTAL).increment(1);
            warn!("accept of booking {id} rejected: overlaps accepted booking {with}");
            return Err(EngineError::Conflict { booking: id, with });
        }

        self.commit_status(&mut guard, booking, status).await
    }

    /// Turn down a pending booking.
    pub async fn decline_booking(
        &self,
        id: BookingId,
        caller: MentorId,
    ) -> Result<Booking, EngineError> {
        let started = Instant::now();
        let result = self.decline_booking_inner(id, caller).await;
        self.finish_write("decline", started, result).await
    }

    async fn decline_booking_inner(
        &self,
        id: BookingId,
        caller: MentorId,
    ) -> Result<Booking, EngineError> {
        let (mut guard, booking) = self.lock_booking(id).await?;
        let status = transition(&booking, BookingStatus::Declined, Actor::Mentor(caller))?;
        self.commit_status(&mut guard, booking, status).await
    }

    /// Cancel a pending or accepted booking. `role` is `"student"` or
    /// `"mentor"` (any case) and decides which party `caller` is checked against.
    pub async fn cancel_booking(
        &self,
        id: BookingId,
        caller: u64,
        role: &str,
    ) -> Result<Booking, EngineError> {
        let started = Instant::now();
        let result = self.cancel_booking_inner(id, caller, role).await;
        self.finish_write("cancel", started, result).await
    }

    async fn cancel_booking_inner(
        &self,
        id: BookingId,
        caller: u64,
        role: &str,
    ) -> Result<Booking, EngineError> {
        let (mut guard, booking) = self.lock_booking(id).await?;
        let role: Role = role.parse()?;
        let status = transition(&booking, BookingStatus::Cancelled, Actor::new(role, caller))?;
        self.commit_status(&mut guard, booking, status).await
    }

    /// Physically remove a booking. An accepted booking that has not started
    /// yet must be cancelled first; everything else goes unconditionally.
    pub async fn delete_booking(&self, id: BookingId) -> Result<Booking, EngineError> {
        let started = Instant::now();
        let result = self.delete_booking_inner(id).await;
        self.finish_write("delete", started, result).await
    }

    async fn delete_booking_inner(&self, id: BookingId) -> Result<Booking, EngineError> {
        let (mut guard, booking) = self.lock_booking(id).await?;
        if booking.status == BookingStatus::Accepted && booking.proposed_start > self.clock.now() {
            return Err(EngineError::StillScheduled(id));
        }
        let event = Event::BookingDeleted {
            id,
            mentor_id: booking.mentor_id,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        info!("booking {id} deleted (was {})", booking.status);
        Ok(booking)
    }

    /// Metrics, then compaction if due. Runs after every mentor lock is released.
    async fn finish_write(
        &self,
        operation: &'static str,
        started: Instant,
        result: Result<Booking, EngineError>,
    ) -> Result<Booking, EngineError> {
        observability::record(operation, started, &result);
        if result.is_ok() {
            self.maybe_compact().await;
        }
        result
    }

    async fn commit_status(
        &self,
        guard: &mut MentorState,
        mut booking: Booking,
        status: BookingStatus,
    ) -> Result<Booking, EngineError> {
        let at = self.clock.now();
        let event = Event::StatusChanged {
            id: booking.id,
            mentor_id: booking.mentor_id,
            status,
            at,
        };
        self.persist_and_apply(guard, &event).await?;
        debug!("booking {}: {} -> {status}", booking.id, booking.status);
        booking.status = status;
        booking.updated_at = at;
        Ok(booking)
    }
}
