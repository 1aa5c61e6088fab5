//! Persistence seam. The engines only talk to these traits; the backing
//! store must enforce one attendance row per (intern, date).

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

use crate::geo::Coordinates;
use crate::model::attendance::AttendanceRecord;
use crate::model::intern::{Intern, InternId};
use crate::model::task::{Task, TaskAssignment};

pub mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find(
        &self,
        intern_id: InternId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>>;

    /// Fails with `Duplicate` when the (intern, date) pair already has a row.
    async fn insert(&self, record: AttendanceRecord) -> StoreResult<AttendanceRecord>;

    /// Stamps the check-out of the (intern, date) row only while it has
    /// none. `Ok(None)` means the row was already checked out and nothing
    /// changed.
    async fn set_check_out(
        &self,
        intern_id: InternId,
        date: NaiveDate,
        at: NaiveDateTime,
        location: Option<Coordinates>,
    ) -> StoreResult<Option<AttendanceRecord>>;

    /// Records with `from <= date <= to`, oldest first.
    async fn list_between(
        &self,
        intern_id: InternId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores the assignment and all of its tasks, or nothing.
    async fn create_assignment(
        &self,
        assignment: TaskAssignment,
        tasks: Vec<Task>,
    ) -> StoreResult<()>;

    async fn assignment(&self, id: Uuid) -> StoreResult<Option<TaskAssignment>>;

    async fn task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    async fn update_task(&self, task: &Task) -> StoreResult<()>;

    async fn delete_task(&self, id: Uuid) -> StoreResult<()>;

    async fn tasks_for_assignment(&self, assignment_id: Uuid) -> StoreResult<Vec<Task>>;

    async fn tasks_for_intern(&self, intern_id: InternId) -> StoreResult<Vec<Task>>;
}

/// Read-only view of the intern roster.
#[async_trait]
pub trait InternDirectory: Send + Sync {
    async fn intern(&self, id: InternId) -> StoreResult<Option<Intern>>;

    async fn active_interns(&self) -> StoreResult<Vec<Intern>>;
}
