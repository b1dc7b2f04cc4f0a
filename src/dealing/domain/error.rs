//! Error types for dealing domain validation and parsing.

use super::{OrderId, OrderState, TaskId, TaskState};
use thiserror::Error;

/// Errors returned while constructing or mutating domain dealing values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DealingDomainError {
    /// Progress values live in the closed interval `[0, 1]`.
    #[error("progress {0} is outside [0, 1]")]
    ProgressOutOfRange(f64),

    /// The performer name is empty after trimming.
    #[error("performer name must not be empty")]
    EmptyPerformerName,

    /// The requested task state transition is not permitted.
    #[error("task {task_id} cannot transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Task whose transition was rejected.
        task_id: TaskId,
        /// State the task currently holds.
        from: TaskState,
        /// State the caller requested.
        to: TaskState,
    },

    /// The requested order state transition is not permitted.
    #[error("order {order_id} cannot transition from {from:?} to {to:?}")]
    InvalidOrderStateTransition {
        /// Order whose transition was rejected.
        order_id: OrderId,
        /// State the order currently holds.
        from: OrderState,
        /// State the caller requested.
        to: OrderState,
    },

    /// The task is not in a leasable state and cannot be occupied.
    #[error("task {task_id} in state {state:?} cannot be occupied")]
    NotLeasable {
        /// Task whose occupation was rejected.
        task_id: TaskId,
        /// State the task currently holds.
        state: TaskState,
    },

    /// The source file's MIME type maps to no known media kind.
    #[error("unsupported mime type `{mime_type}` for file `{path}`")]
    UnsupportedMediaType {
        /// Remote path of the offending file.
        path: String,
        /// MIME type that could not be classified.
        mime_type: String,
    },
}

/// Error returned while parsing task states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task state: {0}")]
pub struct ParseTaskStateError(pub String);

/// Error returned while parsing task steps from persistence or the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task step: {0}")]
pub struct ParseTaskStepError(pub String);

/// Error returned while parsing order states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown order state: {0}")]
pub struct ParseOrderStateError(pub String);
