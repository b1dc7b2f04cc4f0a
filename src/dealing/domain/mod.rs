//! Domain model for work dispatch.
//!
//! The dealing domain models performers, leasable tasks with a validated
//! state machine and TTL-derived occupancy, orders expanding into task
//! batches, and the supporting file-selection and probe-report entities,
//! while keeping all infrastructure concerns outside of the domain boundary.

mod error;
mod failure;
mod ids;
mod order;
mod performer;
mod progress;
mod report;
mod selection;
mod task;

pub use error::{
    DealingDomainError, ParseOrderStateError, ParseTaskStateError, ParseTaskStepError,
};
pub use failure::TaskFailure;
pub use ids::{ClaimId, FailureId, OrderId, PerformerId, ReportId, SelectionId, SelectionItemId, TaskId};
pub use order::{ConvertOrderPayload, Order, OrderPayload, OrderState, PersistedOrderData};
pub use performer::{Performer, PerformerName};
pub use progress::Progress;
pub use report::MediaMetaReport;
pub use selection::{FileSelection, FileSelectionItem, MediaKind};
pub use task::{
    ConvertPayload, ConvertTelemetry, MediaMetaPayload, PersistedTaskData, Task, TaskPayload,
    TaskState, TaskStep,
};
