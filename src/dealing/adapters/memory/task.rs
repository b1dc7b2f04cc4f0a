//! In-memory task repository with the free-task eligibility query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::dealing::{
    domain::{OrderId, PerformerId, SelectionItemId, Task, TaskFailure, TaskId},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    failures: Vec<TaskFailure>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned(err: impl std::fmt::Display) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

impl InMemoryTaskState {
    fn failed_by(&self, task_id: TaskId, performer_id: PerformerId) -> bool {
        self.failures
            .iter()
            .any(|failure| {
                failure.task_id() == task_id && failure.performer_id() == Some(performer_id)
            })
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if !state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::NotFound(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn upsert_batch(&self, tasks: &[Task]) -> TaskRepositoryResult<()> {
        // Single write lock for the whole batch keeps it all-or-nothing.
        let mut state = self.state.write().map_err(lock_poisoned)?;
        for task in tasks {
            state.tasks.insert(task.id(), task.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_by_order_item(
        &self,
        order_id: OrderId,
        item_id: SelectionItemId,
    ) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .tasks
            .values()
            .find(|task| {
                task.order_id() == Some(order_id) && task.selection_item_id() == Some(item_id)
            })
            .cloned())
    }

    async fn list_by_order(&self, order_id: OrderId) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.order_id() == Some(order_id))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(tasks)
    }

    async fn find_first_free(
        &self,
        performer_id: PerformerId,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let found = state
            .tasks
            .values()
            .filter(|task| task.state().is_leasable())
            .filter(|task| !task.is_occupied(now))
            .filter(|task| !state.failed_by(task.id(), performer_id))
            .min_by_key(|task| (task.created_at(), task.id()))
            .cloned();
        Ok(found)
    }

    async fn record_failure(&self, failure: &TaskFailure) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.failures.push(failure.clone());
        Ok(())
    }

    async fn failures_for_task(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<TaskFailure>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .failures
            .iter()
            .filter(|failure| failure.task_id() == task_id)
            .cloned()
            .collect())
    }
}
