use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::db::{InternDirectory, TaskStore};
use crate::error::{CoreError, CoreResult};
use crate::model::intern::{Intern, InternId};
use crate::model::task::{
    AssignTarget, AssignmentCreated, AssignmentStats, NewAssignment, ReviewAction, StatusCounts,
    SubmissionLink, SubmissionReceipt, Task, TaskAssignment, TaskEdit, TaskStatus,
};
use crate::notify::{NotificationSink, TaskEvent};

/// Deadline instant; a missing time means the end of the deadline day.
pub fn deadline_instant(deadline: NaiveDate, deadline_time: Option<NaiveTime>) -> NaiveDateTime {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
    deadline.and_time(deadline_time.unwrap_or(end_of_day))
}

pub fn is_late(deadline: NaiveDate, deadline_time: Option<NaiveTime>, now: NaiveDateTime) -> bool {
    now > deadline_instant(deadline, deadline_time)
}

/// Stored status as seen on `today`: a scheduled task whose start date has
/// arrived reads as pending.
pub fn effective_status(task: &Task, today: NaiveDate) -> TaskStatus {
    match task.status {
        TaskStatus::Scheduled if task.start_date <= today => TaskStatus::Pending,
        status => status,
    }
}

fn initial_status(start_date: NaiveDate, today: NaiveDate) -> TaskStatus {
    if start_date > today {
        TaskStatus::Scheduled
    } else {
        TaskStatus::Pending
    }
}

/// Drives tasks through assignment, submission and review.
pub struct TaskLifecycle {
    store: Arc<dyn TaskStore>,
    directory: Arc<dyn InternDirectory>,
    sink: Arc<dyn NotificationSink>,
}

impl TaskLifecycle {
    pub fn new(
        store: Arc<dyn TaskStore>,
        directory: Arc<dyn InternDirectory>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            directory,
            sink,
        }
    }

    /* =========================
    Create assignment
    ========================= */
    #[instrument(name = "task_create_assignment", skip(self, new), fields(title = %new.title))]
    pub async fn create_assignment(
        &self,
        new: NewAssignment,
        now: NaiveDateTime,
    ) -> CoreResult<AssignmentCreated> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(CoreError::validation("Title is required"));
        }
        if new.deadline < new.start_date {
            return Err(CoreError::validation("Deadline cannot be before the start date"));
        }

        let interns = self.resolve_target(&new.target).await?;

        let today = now.date();
        let status = initial_status(new.start_date, today);
        let scheduled = status == TaskStatus::Scheduled;
        let description = trimmed(new.description.as_deref());

        let assignment = TaskAssignment {
            id: Uuid::new_v4(),
            title: title.clone(),
            description: description.clone(),
            priority: new.priority,
            start_date: new.start_date,
            deadline: new.deadline,
            deadline_time: new.deadline_time,
            assign_to_all: new.target == AssignTarget::All,
            created_by: new.created_by,
            created_at: now,
        };

        let tasks: Vec<Task> = interns
            .iter()
            .map(|intern| Task {
                id: Uuid::new_v4(),
                assignment_id: assignment.id,
                intern_id: intern.id,
                title: title.clone(),
                description: description.clone(),
                priority: new.priority,
                status,
                start_date: new.start_date,
                deadline: new.deadline,
                deadline_time: new.deadline_time,
                started_at: None,
                submitted_at: None,
                completed_at: None,
                approved_at: None,
                is_late: false,
                submission_notes: None,
                links: Vec::new(),
                score: None,
                admin_feedback: None,
                created_at: now,
            })
            .collect();

        let events: Vec<TaskEvent> = tasks
            .iter()
            .map(|t| TaskEvent::TaskAssigned {
                intern_id: t.intern_id,
                task_id: t.id,
                title: t.title.clone(),
            })
            .collect();

        let created = AssignmentCreated {
            assignment_id: assignment.id,
            task_count: tasks.len(),
            scheduled,
        };

        self.store.create_assignment(assignment, tasks).await?;

        info!(
            assignment_id = %created.assignment_id,
            tasks = created.task_count,
            scheduled,
            "Assignment created"
        );

        // scheduled tasks are announced by the caller once they open
        if !scheduled {
            self.notify_all(events).await;
        }

        Ok(created)
    }

    async fn resolve_target(&self, target: &AssignTarget) -> CoreResult<Vec<Intern>> {
        match target {
            AssignTarget::All => {
                let interns = self.directory.active_interns().await?;
                if interns.is_empty() {
                    return Err(CoreError::validation("There are no active interns to assign"));
                }
                Ok(interns)
            }
            AssignTarget::Selected(ids) => {
                if ids.is_empty() {
                    return Err(CoreError::validation("Select at least one intern"));
                }

                let mut seen = HashSet::new();
                let mut interns = Vec::with_capacity(ids.len());
                let mut missing = Vec::new();

                for id in ids.iter().copied().filter(|id| seen.insert(*id)) {
                    match self.directory.intern(id).await? {
                        Some(intern) => interns.push(intern),
                        None => missing.push(id.to_string()),
                    }
                }

                if !missing.is_empty() {
                    return Err(CoreError::validation(format!(
                        "Unknown intern ids: {}",
                        missing.join(", ")
                    )));
                }
                Ok(interns)
            }
        }
    }

    /* =========================
    Intern side
    ========================= */
    #[instrument(name = "task_submit", skip(self, notes, links))]
    pub async fn submit_task(
        &self,
        task_id: Uuid,
        intern_id: InternId,
        notes: Option<&str>,
        links: Vec<SubmissionLink>,
        now: NaiveDateTime,
    ) -> CoreResult<SubmissionReceipt> {
        let mut task = self.owned_task(task_id, intern_id).await?;

        match effective_status(&task, now.date()) {
            TaskStatus::Scheduled => return Err(CoreError::validation("Task has not started yet")),
            TaskStatus::Submitted => {
                return Err(CoreError::validation("Task is already submitted and awaiting review"));
            }
            TaskStatus::Completed => return Err(CoreError::validation("Task is already completed")),
            TaskStatus::Pending | TaskStatus::InProgress | TaskStatus::Revision => {}
        }

        let links: Vec<SubmissionLink> = links
            .into_iter()
            .filter(|l| !l.is_blank())
            .map(|l| SubmissionLink::new(l.label.trim(), l.url.trim()))
            .collect();
        if links.is_empty() {
            return Err(CoreError::validation("At least one submission link is required"));
        }

        // once late, a task stays late
        let late_now = is_late(task.deadline, task.deadline_time, now);
        task.is_late = task.is_late || late_now;
        debug!(late_now, is_late = task.is_late, "Lateness evaluated");

        task.status = TaskStatus::Submitted;
        task.submitted_at = Some(now);
        task.started_at.get_or_insert(now);
        task.submission_notes = trimmed(notes);
        task.links = links;

        self.store.update_task(&task).await?;
        info!(is_late = task.is_late, "Task submitted");

        Ok(SubmissionReceipt {
            task_id: task.id,
            submitted_at: now,
            is_late: task.is_late,
        })
    }

    #[instrument(name = "task_self_status", skip(self))]
    pub async fn update_self_status(
        &self,
        task_id: Uuid,
        intern_id: InternId,
        status: TaskStatus,
        now: NaiveDateTime,
    ) -> CoreResult<Task> {
        if !matches!(status, TaskStatus::Pending | TaskStatus::InProgress) {
            return Err(CoreError::validation(
                "Status can only be set to pending or in_progress",
            ));
        }

        let mut task = self.owned_task(task_id, intern_id).await?;

        match effective_status(&task, now.date()) {
            TaskStatus::Scheduled => return Err(CoreError::validation("Task has not started yet")),
            TaskStatus::Submitted | TaskStatus::Completed => {
                return Err(CoreError::validation(format!(
                    "A {} task can no longer be updated",
                    task.status
                )));
            }
            TaskStatus::Pending | TaskStatus::InProgress | TaskStatus::Revision => {}
        }

        task.status = status;
        if status == TaskStatus::InProgress {
            task.started_at.get_or_insert(now);
        }

        self.store.update_task(&task).await?;
        info!(status = %task.status, "Task status updated");
        Ok(task)
    }

    /// The intern's tasks, effective status applied, nearest deadline first.
    pub async fn list_intern_tasks(
        &self,
        intern_id: InternId,
        today: NaiveDate,
    ) -> CoreResult<Vec<Task>> {
        let mut tasks = self.store.tasks_for_intern(intern_id).await?;
        for task in &mut tasks {
            task.status = effective_status(task, today);
        }
        tasks.sort_by_key(|t| deadline_instant(t.deadline, t.deadline_time));
        Ok(tasks)
    }

    /* =========================
    Admin side
    ========================= */
    #[instrument(name = "task_review", skip(self, feedback))]
    pub async fn review_task(
        &self,
        task_id: Uuid,
        action: ReviewAction,
        score: Option<i32>,
        feedback: Option<&str>,
        now: NaiveDateTime,
    ) -> CoreResult<Task> {
        let mut task = self.task(task_id).await?;

        if task.status != TaskStatus::Submitted {
            return Err(CoreError::validation(format!(
                "Only submitted tasks can be reviewed (task is {})",
                task.status
            )));
        }

        let event = match action {
            ReviewAction::Approve => {
                let score =
                    score.ok_or_else(|| CoreError::validation("A score is required to approve"))?;
                let score = u8::try_from(score)
                    .ok()
                    .filter(|s| *s <= 100)
                    .ok_or_else(|| CoreError::validation("Score must be between 0 and 100"))?;

                task.status = TaskStatus::Completed;
                task.score = Some(score);
                task.completed_at = Some(now);
                task.approved_at = Some(now);
                if let Some(feedback) = trimmed(feedback) {
                    task.admin_feedback = Some(feedback);
                }

                TaskEvent::TaskApproved {
                    intern_id: task.intern_id,
                    task_id: task.id,
                    title: task.title.clone(),
                    score,
                }
            }
            ReviewAction::Revision => {
                let feedback = trimmed(feedback)
                    .ok_or_else(|| {
                        CoreError::validation("Feedback is required when requesting a revision")
                    })?;

                task.status = TaskStatus::Revision;
                task.score = None;
                task.admin_feedback = Some(feedback.clone());

                TaskEvent::RevisionRequested {
                    intern_id: task.intern_id,
                    task_id: task.id,
                    title: task.title.clone(),
                    feedback,
                }
            }
        };

        self.store.update_task(&task).await?;
        info!(status = %task.status, score = ?task.score, "Task reviewed");

        self.notify(event).await;
        Ok(task)
    }

    pub async fn get_task(&self, task_id: Uuid, today: NaiveDate) -> CoreResult<Task> {
        let mut task = self.task(task_id).await?;
        task.status = effective_status(&task, today);
        Ok(task)
    }

    #[instrument(name = "task_edit", skip(self, edit))]
    pub async fn edit_task(
        &self,
        task_id: Uuid,
        edit: TaskEdit,
        today: NaiveDate,
    ) -> CoreResult<Task> {
        let mut task = self.task(task_id).await?;

        if let Some(title) = edit.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(CoreError::validation("Title is required"));
            }
            task.title = title.to_string();
        }
        if let Some(description) = edit.description {
            task.description = trimmed(Some(&description));
        }
        if let Some(priority) = edit.priority {
            task.priority = priority;
        }
        if let Some(start_date) = edit.start_date {
            task.start_date = start_date;
        }
        if let Some(deadline) = edit.deadline {
            task.deadline = deadline;
        }
        if edit.deadline_time.is_some() {
            task.deadline_time = edit.deadline_time;
        }

        if task.deadline < task.start_date {
            return Err(CoreError::validation("Deadline cannot be before the start date"));
        }

        // an untouched task follows its start date
        if matches!(task.status, TaskStatus::Scheduled | TaskStatus::Pending)
            && task.started_at.is_none()
        {
            task.status = initial_status(task.start_date, today);
        }

        self.store.update_task(&task).await?;
        info!(status = %task.status, "Task edited");
        Ok(task)
    }

    #[instrument(name = "task_delete", skip(self))]
    pub async fn delete_task(&self, task_id: Uuid) -> CoreResult<()> {
        self.store.delete_task(task_id).await?;
        info!("Task deleted");
        Ok(())
    }

    /* =========================
    Statistics
    ========================= */
    pub async fn assignment_stats(
        &self,
        assignment_id: Uuid,
        today: NaiveDate,
    ) -> CoreResult<AssignmentStats> {
        if self.store.assignment(assignment_id).await?.is_none() {
            return Err(CoreError::not_found(format!("assignment {assignment_id}")));
        }
        let tasks = self.store.tasks_for_assignment(assignment_id).await?;
        Ok(aggregate(assignment_id, &tasks, today))
    }

    async fn task(&self, task_id: Uuid) -> CoreResult<Task> {
        self.store
            .task(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("task {task_id}")))
    }

    /// Tasks of other interns are reported as missing.
    async fn owned_task(&self, task_id: Uuid, intern_id: InternId) -> CoreResult<Task> {
        let task = self.task(task_id).await?;
        if task.intern_id != intern_id {
            return Err(CoreError::not_found(format!("task {task_id}")));
        }
        Ok(task)
    }

    async fn notify(&self, event: TaskEvent) {
        let intern_id = event.intern_id();
        if let Err(e) = self.sink.emit(event).await {
            warn!(error = %e, intern_id, "Notification failed");
        }
    }

    async fn notify_all(&self, events: Vec<TaskEvent>) {
        let sends = events.into_iter().map(|event| self.notify(event));
        futures::future::join_all(sends).await;
    }
}

/// Per-status counts, lateness split and progress over one assignment.
pub fn aggregate(assignment_id: Uuid, tasks: &[Task], today: NaiveDate) -> AssignmentStats {
    let mut counts = StatusCounts::default();
    let mut completed_late = 0;
    let mut scores = Vec::new();

    for task in tasks {
        let status = effective_status(task, today);
        counts.add(status);
        if status == TaskStatus::Completed {
            if task.is_late {
                completed_late += 1;
            }
            if let Some(score) = task.score {
                scores.push(f64::from(score));
            }
        }
    }

    let total = tasks.len();
    let completed = counts.completed;
    let progress_percentage = if total == 0 {
        0
    } else {
        ((completed * 100 + total / 2) / total) as u32
    };
    let average_score = if scores.is_empty() {
        None
    } else {
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        Some((mean * 100.0).round() / 100.0)
    };

    AssignmentStats {
        assignment_id,
        total,
        counts,
        completed,
        completed_on_time: completed - completed_late,
        completed_late,
        average_score,
        progress_percentage,
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
