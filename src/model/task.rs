use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::model::intern::InternId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Scheduled,
    Pending,
    InProgress,
    Submitted,
    Revision,
    Completed,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionLink {
    pub label: String,
    pub url: String,
}

impl SubmissionLink {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.label.trim().is_empty() || self.url.trim().is_empty()
    }
}

/// A batch of tasks created together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub start_date: NaiveDate,
    pub deadline: NaiveDate,
    pub deadline_time: Option<NaiveTime>,
    pub assign_to_all: bool,
    /// Admin user id from the auth layer.
    pub created_by: u64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub intern_id: InternId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub start_date: NaiveDate,
    pub deadline: NaiveDate,
    pub deadline_time: Option<NaiveTime>,
    pub started_at: Option<NaiveDateTime>,
    pub submitted_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub approved_at: Option<NaiveDateTime>,
    pub is_late: bool,
    pub submission_notes: Option<String>,
    pub links: Vec<SubmissionLink>,
    pub score: Option<u8>,
    pub admin_feedback: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Who receives the tasks of a new assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignTarget {
    All,
    Selected(Vec<InternId>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub start_date: NaiveDate,
    pub deadline: NaiveDate,
    pub deadline_time: Option<NaiveTime>,
    pub target: AssignTarget,
    /// Admin user id from the auth layer.
    pub created_by: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentCreated {
    pub assignment_id: Uuid,
    pub task_count: usize,
    pub scheduled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Revision,
}

/// Admin edit of a single task. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub deadline_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub scheduled: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub submitted: usize,
    pub revision: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Scheduled => self.scheduled += 1,
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Submitted => self.submitted += 1,
            TaskStatus::Revision => self.revision += 1,
            TaskStatus::Completed => self.completed += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentStats {
    pub assignment_id: Uuid,
    pub total: usize,
    pub counts: StatusCounts,
    pub completed: usize,
    pub completed_on_time: usize,
    pub completed_late: usize,
    pub average_score: Option<f64>,
    pub progress_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub task_id: Uuid,
    pub submitted_at: NaiveDateTime,
    pub is_late: bool,
}
