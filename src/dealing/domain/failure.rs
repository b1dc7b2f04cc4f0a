//! Append-only task failure records.

use super::{FailureId, PerformerId, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A single recorded failure of a task.
///
/// The existence of a record for a `(task, performer)` pair permanently
/// excludes that performer from re-claiming that exact task. A record
/// without a performer marks a dispatcher-induced failure (e.g. result
/// verification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    id: FailureId,
    task_id: TaskId,
    performer_id: Option<PerformerId>,
    reason: String,
    created_at: DateTime<Utc>,
}

impl TaskFailure {
    /// Records a failure reported by a performer.
    #[must_use]
    pub fn reported(
        task_id: TaskId,
        performer_id: PerformerId,
        reason: impl Into<String>,
        clock: &(impl Clock + ?Sized),
    ) -> Self {
        Self {
            id: FailureId::new(),
            task_id,
            performer_id: Some(performer_id),
            reason: reason.into(),
            created_at: clock.utc(),
        }
    }

    /// Records a dispatcher-induced failure with no performer attached.
    #[must_use]
    pub fn induced(task_id: TaskId, reason: impl Into<String>, clock: &(impl Clock + ?Sized)) -> Self {
        Self {
            id: FailureId::new(),
            task_id,
            performer_id: None,
            reason: reason.into(),
            created_at: clock.utc(),
        }
    }

    /// Returns the failure identifier.
    #[must_use]
    pub const fn id(&self) -> FailureId {
        self.id
    }

    /// Returns the failed task's identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the reporting performer, or `None` for dispatcher-induced
    /// failures.
    #[must_use]
    pub const fn performer_id(&self) -> Option<PerformerId> {
        self.performer_id
    }

    /// Returns the recorded failure reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the record's creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
