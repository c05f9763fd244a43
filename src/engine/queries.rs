use crate::model::*;

use super::store::sort_by_start;
use super::{Engine, EngineError, Entity};

impl Engine {
    pub fn get_booking(&self, id: BookingId) -> Result<Booking, EngineError> {
        self.store
            .get(&id)
            .ok_or(EngineError::NotFound(Entity::Booking(id)))
    }

    pub async fn bookings_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Booking>, EngineError> {
        if !self.collaborators.students.exists(student_id).await {
            return Err(EngineError::NotFound(Entity::Student(student_id)));
        }
        Ok(self.store.list(&BookingFilter::student(student_id)))
    }

    pub async fn bookings_by_mentor(
        &self,
        mentor_id: MentorId,
    ) -> Result<Vec<Booking>, EngineError> {
        self.ensure_mentor(mentor_id).await?;
        Ok(self.store.list_for_mentor(mentor_id, None).await)
    }

    pub async fn bookings_by_mentor_and_status(
        &self,
        mentor_id: MentorId,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, EngineError> {
        self.ensure_mentor(mentor_id).await?;
        Ok(self.store.list_for_mentor(mentor_id, Some(status)).await)
    }

    pub async fn bookings_by_task(&self, task_id: TaskId) -> Result<Vec<Booking>, EngineError> {
        if self.collaborators.tasks.duration_minutes(task_id).await.is_none() {
            return Err(EngineError::NotFound(Entity::Task(task_id)));
        }
        Ok(self.store.list(&BookingFilter::task(task_id)))
    }

    pub fn bookings_by_status(&self, status: BookingStatus) -> Vec<Booking> {
        self.store.list(&BookingFilter::status(status))
    }

    pub fn all_bookings(&self) -> Vec<Booking> {
        self.store.list(&BookingFilter::default())
    }

    /// Resolve a filter the way the listing endpoint does: the first of
    /// student, mentor (with optional status), task, status that is set
    /// decides the query; with none set, everything is returned.
    pub async fn query_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, EngineError> {
        let mut out = if let Some(student_id) = filter.student_id {
            self.bookings_by_student(student_id).await?
        } else if let Some(mentor_id) = filter.mentor_id {
            match filter.status {
                Some(status) => self.bookings_by_mentor_and_status(mentor_id, status).await?,
                None => self.bookings_by_mentor(mentor_id).await?,
            }
        } else if let Some(task_id) = filter.task_id {
            self.bookings_by_task(task_id).await?
        } else if let Some(status) = filter.status {
            self.bookings_by_status(status)
        } else {
            self.all_bookings()
        };
        if filter.sorted {
            sort_by_start(&mut out);
        }
        Ok(out)
    }

    async fn ensure_mentor(&self, mentor_id: MentorId) -> Result<(), EngineError> {
        if self.collaborators.mentors.exists(mentor_id).await {
            Ok(())
        } else {
            Err(EngineError::NotFound(Entity::Mentor(mentor_id)))
        }
    }
}
