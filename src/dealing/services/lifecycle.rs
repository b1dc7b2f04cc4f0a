//! Order lifecycle cascades and per-type result verification.

use crate::dealing::{
    domain::{
        DealingDomainError, MediaMetaReport, Order, OrderId, OrderPayload, Task, TaskFailure,
        TaskPayload, TaskState,
    },
    ports::{
        DynOrderRepository, DynReportRepository, DynTaskRepository, OrderRepositoryError,
        ReportRepositoryError, TaskRepositoryError,
    },
};
use crate::storage::remote::{DynRemoteStorage, RemoteStorageError, join_remote_path};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by order lifecycle operations.
#[derive(Debug, Error)]
pub enum OrderLifecycleError {
    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// A state transition was rejected.
    #[error(transparent)]
    Domain(#[from] DealingDomainError),

    /// Order persistence failure.
    #[error(transparent)]
    Orders(#[from] OrderRepositoryError),

    /// Task persistence failure.
    #[error(transparent)]
    Tasks(#[from] TaskRepositoryError),
}

/// Publishes and cancels orders, cascading to their tasks.
pub struct OrderLifecycleService {
    orders: DynOrderRepository,
    tasks: DynTaskRepository,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl OrderLifecycleService {
    /// Creates a lifecycle service over the order and task repositories.
    #[must_use]
    pub fn new(
        orders: DynOrderRepository,
        tasks: DynTaskRepository,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            orders,
            tasks,
            clock,
        }
    }

    /// Creates and stores a new order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::Orders`] when the order cannot be
    /// stored.
    pub async fn create(
        &self,
        payload: OrderPayload,
        file_selection_id: Option<crate::dealing::domain::SelectionId>,
    ) -> Result<Order, OrderLifecycleError> {
        let order = Order::new(payload, file_selection_id, &*self.clock);
        self.orders.store(&order).await?;
        Ok(order)
    }

    /// Publishes the order and every owned task still in `created` state.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::Domain`] when the order cannot be
    /// published from its current state.
    pub async fn publish(&self, order_id: OrderId) -> Result<Order, OrderLifecycleError> {
        let mut order = self.load(order_id).await?;
        order.publish(&*self.clock)?;
        self.orders.update(&order).await?;

        let mut tasks = self.tasks.list_by_order(order_id).await?;
        for task in &mut tasks {
            if task.state() == TaskState::Created {
                task.transition_to(TaskState::Published, &*self.clock)?;
            }
        }
        self.tasks.upsert_batch(&tasks).await?;
        Ok(order)
    }

    /// Cancels the order and every owned task not already terminal.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::Domain`] when the order cannot be
    /// cancelled from its current state.
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order, OrderLifecycleError> {
        let mut order = self.load(order_id).await?;
        order.cancel(&*self.clock)?;
        self.orders.update(&order).await?;

        let mut tasks = self.tasks.list_by_order(order_id).await?;
        for task in &mut tasks {
            if !task.state().is_terminal() {
                task.transition_to(TaskState::Cancelled, &*self.clock)?;
            }
        }
        self.tasks.upsert_batch(&tasks).await?;
        Ok(order)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order, OrderLifecycleError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(OrderLifecycleError::OrderNotFound(order_id))
    }
}

/// Errors returned by result verification.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// A state transition was rejected.
    #[error(transparent)]
    Domain(#[from] DealingDomainError),

    /// Task persistence failure.
    #[error(transparent)]
    Tasks(#[from] TaskRepositoryError),

    /// Report persistence failure.
    #[error(transparent)]
    Reports(#[from] ReportRepositoryError),
}

/// Failure funnel for pulling a probe result off remote storage.
#[derive(Debug, Error)]
enum PullError {
    #[error(transparent)]
    Remote(#[from] RemoteStorageError),

    #[error("result is not valid json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Verifies task results when a performer reports completion.
///
/// Verification runs before the task commits to `finished`: a convert task
/// is accepted as-is, while a metadata task must have uploaded a parseable
/// probe report. A task failing verification moves to `failed` with a
/// dispatcher-induced failure record instead.
pub struct ResultVerificationService {
    tasks: DynTaskRepository,
    reports: DynReportRepository,
    remote: DynRemoteStorage,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl ResultVerificationService {
    /// Creates a verification service over task/report persistence and the
    /// remote filesystem tool.
    #[must_use]
    pub fn new(
        tasks: DynTaskRepository,
        reports: DynReportRepository,
        remote: DynRemoteStorage,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            tasks,
            reports,
            remote,
            clock,
        }
    }

    /// Finishes the task, verifying its result per task type.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] when a transition or persistence
    /// operation fails; a *verification* failure is not an error here, it
    /// moves the task to `failed` and returns `Ok`.
    pub async fn finish(&self, task: &mut Task) -> Result<(), VerificationError> {
        match task.payload() {
            TaskPayload::Convert(_) => self.accept(task).await,
            TaskPayload::MediaMeta(payload) => {
                let input = payload.input_remote_path.clone();
                let output = payload.output_remote_path.clone();
                match self.pull_report(&input, &output).await {
                    Ok(Some(report)) => {
                        self.reports.store(&report).await?;
                        task.link_report(report.id(), &*self.clock);
                        self.accept(task).await
                    }
                    Ok(None) => {
                        self.mark_failed(task, "result json not found in output path")
                            .await
                    }
                    Err(err) => {
                        self.mark_failed(task, &format!("failed to pull result: {err}"))
                            .await
                    }
                }
            }
        }
    }

    async fn accept(&self, task: &mut Task) -> Result<(), VerificationError> {
        task.transition_to(TaskState::Finished, &*self.clock)?;
        task.mark_result_verified(&*self.clock);
        self.tasks.update(task).await?;
        Ok(())
    }

    async fn mark_failed(&self, task: &mut Task, reason: &str) -> Result<(), VerificationError> {
        let failure = TaskFailure::induced(task.id(), reason, &*self.clock);
        task.transition_to(TaskState::Failed, &*self.clock)?;
        self.tasks.record_failure(&failure).await?;
        self.tasks.update(task).await?;
        Ok(())
    }

    /// Fetches the newest JSON report uploaded under the task's output
    /// path, if any.
    async fn pull_report(
        &self,
        input_path: &str,
        output_path: &str,
    ) -> Result<Option<MediaMetaReport>, PullError> {
        let entries = self.remote.list(output_path).await?;
        let Some(found) = entries
            .iter()
            .filter(|entry| !entry.name.starts_with('.'))
            .filter(|entry| entry.mime_type == "application/json")
            .max_by_key(|entry| entry.mod_time)
        else {
            return Ok(None);
        };

        let content = self
            .remote
            .read(&join_remote_path(output_path, &[found.name.as_str()]))
            .await?;
        let data = serde_json::from_slice(&content)?;
        Ok(Some(MediaMetaReport::from_probe(
            input_path,
            data,
            &*self.clock,
        )))
    }
}
