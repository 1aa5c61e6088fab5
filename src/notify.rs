use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::model::intern::InternId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    TaskAssigned {
        intern_id: InternId,
        task_id: Uuid,
        title: String,
    },
    TaskApproved {
        intern_id: InternId,
        task_id: Uuid,
        title: String,
        score: u8,
    },
    RevisionRequested {
        intern_id: InternId,
        task_id: Uuid,
        title: String,
        feedback: String,
    },
}

impl TaskEvent {
    pub fn intern_id(&self) -> InternId {
        match self {
            TaskEvent::TaskAssigned { intern_id, .. }
            | TaskEvent::TaskApproved { intern_id, .. }
            | TaskEvent::RevisionRequested { intern_id, .. } => *intern_id,
        }
    }
}

#[derive(Debug, Error)]
#[error("notification not delivered: {0}")]
pub struct NotifyError(pub String);

/// Outbound event seam. Delivery is fire-and-forget from the engine's side.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, event: TaskEvent) -> Result<(), NotifyError>;
}

/// Writes events to the log instead of delivering them.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn emit(&self, event: TaskEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(&event).map_err(|e| NotifyError(e.to_string()))?;
        info!(intern_id = event.intern_id(), %payload, "Notification");
        Ok(())
    }
}
