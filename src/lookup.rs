//! Read-only questions the booking engine asks about entities it does not own.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use crate::model::{MentorId, StudentId, TaskId};

#[async_trait]
pub trait MentorLookup: Send + Sync {
    async fn exists(&self, mentor_id: MentorId) -> bool;

    /// True only if the task exists and belongs to this mentor.
    async fn owns_task(&self, mentor_id: MentorId, task_id: TaskId) -> bool;
}

#[async_trait]
pub trait StudentLookup: Send + Sync {
    async fn exists(&self, student_id: StudentId) -> bool;
}

#[async_trait]
pub trait TaskLookup: Send + Sync {
    /// Session length of the task, or `None` if the task does not exist.
    async fn duration_minutes(&self, task_id: TaskId) -> Option<i64>;
}

/// The three lookups the engine is wired with.
#[derive(Clone)]
pub struct Collaborators {
    pub mentors: Arc<dyn MentorLookup>,
    pub students: Arc<dyn StudentLookup>,
    pub tasks: Arc<dyn TaskLookup>,
}

impl Collaborators {
    /// Use one object for all three lookups.
    pub fn from_directory<D>(directory: Arc<D>) -> Self
    where
        D: MentorLookup + StudentLookup + TaskLookup + 'static,
    {
        Self {
            mentors: directory.clone(),
            students: directory.clone(),
            tasks: directory,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TaskEntry {
    mentor_id: MentorId,
    duration_minutes: i64,
}

/// In-process directory of students, mentors and tasks.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    students: DashSet<StudentId>,
    mentors: DashSet<MentorId>,
    tasks: DashMap<TaskId, TaskEntry>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&self, id: StudentId) {
        self.students.insert(id);
    }

    pub fn add_mentor(&self, id: MentorId) {
        self.mentors.insert(id);
    }

    /// Register (or redefine) a task owned by `mentor_id`.
    pub fn add_task(&self, id: TaskId, mentor_id: MentorId, duration_minutes: i64) {
        self.tasks.insert(id, TaskEntry { mentor_id, duration_minutes });
    }

    pub fn remove_task(&self, id: TaskId) {
        self.tasks.remove(&id);
    }
}

#[async_trait]
impl MentorLookup for InMemoryDirectory {
    async fn exists(&self, mentor_id: MentorId) -> bool {
        self.mentors.contains(&mentor_id)
    }

    async fn owns_task(&self, mentor_id: MentorId, task_id: TaskId) -> bool {
        self.tasks
            .get(&task_id)
            .is_some_and(|t| t.mentor_id == mentor_id)
    }
}

#[async_trait]
impl StudentLookup for InMemoryDirectory {
    async fn exists(&self, student_id: StudentId) -> bool {
        self.students.contains(&student_id)
    }
}

#[async_trait]
impl TaskLookup for InMemoryDirectory {
    async fn duration_minutes(&self, task_id: TaskId) -> Option<i64> {
        self.tasks.get(&task_id).map(|t| t.duration_minutes)
    }
}
