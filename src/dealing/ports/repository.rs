//! Repository ports for dealing persistence, lookup, and the free-task query.

use crate::dealing::domain::{
    FileSelection, MediaMetaReport, Order, OrderId, Performer, PerformerId, SelectionId,
    SelectionItemId, Task, TaskFailure, TaskId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task persistence contract.
///
/// The free-task query encodes the leasing eligibility rules so relational
/// adapters can evaluate them storage-side; callers still serialize
/// claim-writes behind the leasing service's advisory lock.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the task ID
    /// already exists.
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Persists changes to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not
    /// exist.
    async fn update(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Stores or updates a batch of tasks atomically (all-or-nothing).
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the batch cannot be committed; no
    /// partial writes survive.
    async fn upsert_batch(&self, tasks: &[Task]) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Finds the task expanded for an order/source-item pair, if any.
    async fn find_by_order_item(
        &self,
        order_id: OrderId,
        item_id: SelectionItemId,
    ) -> TaskRepositoryResult<Option<Task>>;

    /// Returns all tasks owned by an order.
    async fn list_by_order(&self, order_id: OrderId) -> TaskRepositoryResult<Vec<Task>>;

    /// Finds the oldest-created task eligible for leasing by `performer_id`
    /// at `now`: leasable state, no live lease, and no failure recorded by
    /// this performer.
    async fn find_first_free(
        &self,
        performer_id: PerformerId,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<Option<Task>>;

    /// Appends a failure record.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the record cannot be appended.
    async fn record_failure(&self, failure: &TaskFailure) -> TaskRepositoryResult<()>;

    /// Returns all failure records for a task, oldest first.
    async fn failures_for_task(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<TaskFailure>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Result type for order repository operations.
pub type OrderRepositoryResult<T> = Result<T, OrderRepositoryError>;

/// Order persistence contract.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderRepositoryError::DuplicateOrder`] when the order ID
    /// already exists.
    async fn store(&self, order: &Order) -> OrderRepositoryResult<()>;

    /// Persists changes to an existing order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderRepositoryError::NotFound`] when the order does not
    /// exist.
    async fn update(&self, order: &Order) -> OrderRepositoryResult<()>;

    /// Finds an order by identifier.
    ///
    /// Returns `None` when the order does not exist.
    async fn find_by_id(&self, id: OrderId) -> OrderRepositoryResult<Option<Order>>;
}

/// Errors returned by order repository implementations.
#[derive(Debug, Clone, Error)]
pub enum OrderRepositoryError {
    /// An order with the same identifier already exists.
    #[error("duplicate order identifier: {0}")]
    DuplicateOrder(OrderId),

    /// The order was not found.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl OrderRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Result type for performer repository operations.
pub type PerformerRepositoryResult<T> = Result<T, PerformerRepositoryError>;

/// Performer persistence contract.
#[async_trait]
pub trait PerformerRepository: Send + Sync {
    /// Stores a new performer.
    ///
    /// # Errors
    ///
    /// Returns [`PerformerRepositoryError::DuplicateName`] when the name is
    /// already taken.
    async fn store(&self, performer: &Performer) -> PerformerRepositoryResult<()>;

    /// Finds a performer by identifier.
    ///
    /// Returns `None` when the performer does not exist.
    async fn find_by_id(&self, id: PerformerId) -> PerformerRepositoryResult<Option<Performer>>;

    /// Finds a performer by unique name.
    ///
    /// Returns `None` when no performer carries the name.
    async fn find_by_name(&self, name: &str) -> PerformerRepositoryResult<Option<Performer>>;
}

/// Errors returned by performer repository implementations.
#[derive(Debug, Clone, Error)]
pub enum PerformerRepositoryError {
    /// A performer with the same name already exists.
    #[error("duplicate performer name: {0}")]
    DuplicateName(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl PerformerRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Result type for selection repository operations.
pub type SelectionRepositoryResult<T> = Result<T, SelectionRepositoryError>;

/// File selection persistence contract.
#[async_trait]
pub trait SelectionRepository: Send + Sync {
    /// Stores a new selection with its items.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the selection cannot be stored.
    async fn store(&self, selection: &FileSelection) -> SelectionRepositoryResult<()>;

    /// Finds a selection by identifier.
    ///
    /// Returns `None` when the selection does not exist.
    async fn find_by_id(&self, id: SelectionId) -> SelectionRepositoryResult<Option<FileSelection>>;
}

/// Errors returned by selection repository implementations.
#[derive(Debug, Clone, Error)]
pub enum SelectionRepositoryError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SelectionRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Result type for report repository operations.
pub type ReportRepositoryResult<T> = Result<T, ReportRepositoryError>;

/// Media probe report persistence contract.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Stores a probe report.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the report cannot be stored.
    async fn store(&self, report: &MediaMetaReport) -> ReportRepositoryResult<()>;

    /// Finds the cached report for a file, keyed by path and size.
    ///
    /// Returns `None` when no probe has been recorded for the pair.
    async fn find_by_path_and_size(
        &self,
        remote_path: &str,
        size: u64,
    ) -> ReportRepositoryResult<Option<MediaMetaReport>>;
}

/// Errors returned by report repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ReportRepositoryError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ReportRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Shared handle to a task repository.
pub type DynTaskRepository = Arc<dyn TaskRepository>;
/// Shared handle to an order repository.
pub type DynOrderRepository = Arc<dyn OrderRepository>;
/// Shared handle to a performer repository.
pub type DynPerformerRepository = Arc<dyn PerformerRepository>;
/// Shared handle to a selection repository.
pub type DynSelectionRepository = Arc<dyn SelectionRepository>;
/// Shared handle to a report repository.
pub type DynReportRepository = Arc<dyn ReportRepository>;
