use std::fmt;

use crate::model::{Actor, BookingId, BookingStatus, MentorId, StudentId, TaskId};

/// The entity a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Student(StudentId),
    Mentor(MentorId),
    Task(TaskId),
    Booking(BookingId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Student(id) => write!(f, "student {id}"),
            Entity::Mentor(id) => write!(f, "mentor {id}"),
            Entity::Task(id) => write!(f, "task {id}"),
            Entity::Booking(id) => write!(f, "booking {id}"),
        }
    }
}

/// Coarse category a request layer maps onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    PermissionDenied,
    InvalidTransition,
    Conflict,
    Unavailable,
}

#[derive(Debug)]
pub enum EngineError {
    NotFound(Entity),
    InvalidArgument(String),
    PermissionDenied {
        booking: BookingId,
        caller: Actor,
    },
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    /// Accepting `booking` would overlap the accepted booking `with`.
    Conflict {
        booking: BookingId,
        with: BookingId,
    },
    /// An accepted booking that has not started yet cannot be deleted.
    StillScheduled(BookingId),
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::InvalidArgument(_) | EngineError::LimitExceeded(_) => {
                ErrorKind::InvalidArgument
            }
            EngineError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            EngineError::InvalidTransition { .. } | EngineError::StillScheduled(_) => {
                ErrorKind::InvalidTransition
            }
            EngineError::Conflict { .. } => ErrorKind::Conflict,
            EngineError::WalError(_) => ErrorKind::Unavailable,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotFound(entity) => write!(f, "not found: {entity}"),
            EngineError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EngineError::PermissionDenied { booking, caller } => {
                write!(f, "{caller} is not a party to booking {booking}")
            }
            EngineError::InvalidTransition { from, .. } if from.is_terminal() => {
                write!(f, "booking is already {from}")
            }
            EngineError::InvalidTransition { from, to } => {
                write!(f, "cannot move booking from {from} to {to}")
            }
            EngineError::Conflict { booking, with } => write!(
                f,
                "booking {booking} overlaps accepted booking {with}; decline it or pick another slot"
            ),
            EngineError::StillScheduled(id) => write!(
                f,
                "booking {id} is accepted and has not started; cancel it first"
            ),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
