//! Orchestration services for the dealing core.

pub mod expansion;
pub mod leasing;
pub mod lifecycle;
pub mod opts;

pub use expansion::{ConvertOrderExpansion, ExpansionError, ExpansionResult};
pub use leasing::{AdvisoryLocks, FIND_FREE_TASK_SECTION, LeasingError, LeasingService};
pub use lifecycle::{
    OrderLifecycleService, OrderLifecycleError, ResultVerificationService, VerificationError,
};
