//! Port contracts for dealing persistence.

mod repository;

pub use repository::{
    DynOrderRepository, DynPerformerRepository, DynReportRepository, DynSelectionRepository,
    DynTaskRepository, OrderRepository, OrderRepositoryError, OrderRepositoryResult,
    PerformerRepository, PerformerRepositoryError, PerformerRepositoryResult, ReportRepository,
    ReportRepositoryError, ReportRepositoryResult, SelectionRepository, SelectionRepositoryError,
    SelectionRepositoryResult, TaskRepository, TaskRepositoryError, TaskRepositoryResult,
};
