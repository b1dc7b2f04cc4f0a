//! Order expansion: materializing one task per selected source file.
//!
//! Re-running expansion is idempotent per (order, source item): an existing
//! task is updated in place, keeping its identifier and derived paths. Any
//! per-file failure aborts the whole batch before anything is persisted.

use super::opts::{render_template, string_to_args};
use crate::dealing::{
    domain::{
        ConvertOrderPayload, ConvertPayload, ConvertTelemetry, FileSelectionItem, MediaKind, Order,
        OrderId, OrderPayload, SelectionId, Task, TaskPayload,
    },
    ports::{
        DynOrderRepository, DynReportRepository, DynSelectionRepository, DynTaskRepository,
        OrderRepositoryError, ReportRepositoryError, SelectionRepositoryError, TaskRepositoryError,
    },
};
use crate::storage::paths::generalize_paths;
use crate::storage::remote::{RemotePath, join_remote_path};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Result type for order expansion.
pub type ExpansionResult<T> = Result<T, ExpansionError>;

/// Errors returned by order expansion.
#[derive(Debug, Error)]
pub enum ExpansionError {
    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order carries no file selection to expand.
    #[error("order {0} has no file selection")]
    MissingSelection(OrderId),

    /// The order references a selection that does not exist.
    #[error("file selection not found: {0}")]
    SelectionNotFound(SelectionId),

    /// Building the task for one source file failed; the batch aborts.
    #[error("failed to create task for file `{path}`: {message}")]
    TaskBuild {
        /// Remote path of the offending source file.
        path: String,
        /// Human-readable build failure.
        message: String,
    },

    /// Order persistence failure.
    #[error(transparent)]
    Orders(#[from] OrderRepositoryError),

    /// Task persistence failure.
    #[error(transparent)]
    Tasks(#[from] TaskRepositoryError),

    /// Selection persistence failure.
    #[error(transparent)]
    Selections(#[from] SelectionRepositoryError),

    /// Report persistence failure.
    #[error(transparent)]
    Reports(#[from] ReportRepositoryError),
}

/// Expands convert orders into per-file tasks.
pub struct ConvertOrderExpansion {
    orders: DynOrderRepository,
    selections: DynSelectionRepository,
    tasks: DynTaskRepository,
    reports: DynReportRepository,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl ConvertOrderExpansion {
    /// Creates an expansion service over the dealing repositories.
    #[must_use]
    pub fn new(
        orders: DynOrderRepository,
        selections: DynSelectionRepository,
        tasks: DynTaskRepository,
        reports: DynReportRepository,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            orders,
            selections,
            tasks,
            reports,
            clock,
        }
    }

    /// Materializes one task per non-removed selection item and persists
    /// the batch atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ExpansionError::TaskBuild`] (naming the file) when any
    /// single task cannot be built, in which case nothing is persisted,
    /// or a repository error when persistence fails.
    pub async fn expand(&self, order_id: OrderId) -> ExpansionResult<Vec<Task>> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ExpansionError::OrderNotFound(order_id))?;
        let selection_id = order
            .file_selection_id()
            .ok_or(ExpansionError::MissingSelection(order_id))?;
        let selection = self
            .selections
            .find_by_id(selection_id)
            .await?
            .ok_or(ExpansionError::SelectionNotFound(selection_id))?;

        let OrderPayload::Convert(template) = order.payload();

        let source_paths: Vec<String> = selection
            .active_items()
            .map(|item| item.remote_path().to_owned())
            .collect();
        let common = generalize_paths(&source_paths);

        let mut tasks = Vec::new();
        for item in selection.active_items() {
            let task = self
                .build_task(&order, template, item, common.as_deref())
                .await?;
            tasks.push(task);
        }

        self.tasks.upsert_batch(&tasks).await?;
        Ok(tasks)
    }

    /// Builds (or idempotently updates) the task for one source file.
    async fn build_task(
        &self,
        order: &Order,
        template: &ConvertOrderPayload,
        item: &FileSelectionItem,
        common: Option<&str>,
    ) -> ExpansionResult<Task> {
        let opts = build_opts(template, item).map_err(|message| ExpansionError::TaskBuild {
            path: item.remote_path().to_owned(),
            message,
        })?;

        let mut task = match self.tasks.find_by_order_item(order.id(), item.id()).await? {
            Some(existing) => existing,
            None => Task::for_order(
                TaskPayload::Convert(ConvertPayload {
                    opts: Vec::new(),
                    input_remote_path: item.remote_path().to_owned(),
                    output_remote_path: String::new(),
                    media_meta_report_id: None,
                    telemetry: ConvertTelemetry::default(),
                }),
                order.id(),
                item.id(),
                &*self.clock,
            ),
        };

        let report = self
            .reports
            .find_by_path_and_size(item.remote_path(), item.size())
            .await?;

        let payload = TaskPayload::Convert(ConvertPayload {
            opts,
            input_remote_path: item.remote_path().to_owned(),
            output_remote_path: derive_output_path(
                &template.output_remote_path,
                item.remote_path(),
                common,
                &task.id().to_string(),
            ),
            media_meta_report_id: report.map(|report| report.id()),
            telemetry: ConvertTelemetry::default(),
        });
        task.replace_payload(payload, &*self.clock);

        Ok(task)
    }
}

/// Instantiates the order's option template for one source file.
///
/// The template branch follows the file's media kind; non-media MIME types
/// are a hard configuration error.
fn build_opts(template: &ConvertOrderPayload, item: &FileSelectionItem) -> Result<Vec<String>, String> {
    let parsed = RemotePath::parse(item.remote_path());
    let file_name = parsed.file_name().unwrap_or_default();
    let basename = basename_no_ext(file_name);

    let (opts_template, muxer) = match item.media_kind() {
        Some(MediaKind::Video) => (&template.video_opts, &template.video_muxer),
        Some(MediaKind::Audio) => (&template.audio_opts, &template.audio_muxer),
        None => {
            return Err(format!("unsupported mime type `{}`", item.mime_type()));
        }
    };

    let input_path = format!("input/{file_name}");
    let output_path = format!("output/{basename}.{muxer}");
    let rendered = render_template(opts_template, &input_path, &output_path, &basename);
    Ok(string_to_args(&rendered))
}

/// Derives the task's output directory from the common ancestor, falling
/// back to a per-task-id directory when no ancestor exists.
fn derive_output_path(
    output_root: &str,
    item_path: &str,
    common: Option<&str>,
    task_id: &str,
) -> String {
    match common {
        Some(common) => {
            let item_parsed = RemotePath::parse(item_path);
            let common_parsed = RemotePath::parse(common);
            let relative = item_parsed
                .path
                .strip_prefix(common_parsed.path.trim_end_matches('/'))
                .unwrap_or("")
                .trim_start_matches('/');
            let directory = relative.rsplit_once('/').map_or("", |(dir, _)| dir);
            join_remote_path(output_root, &[directory, "/"])
        }
        None => join_remote_path(output_root, &[task_id, "/"]),
    }
}

/// Strips the final extension from a file name.
fn basename_no_ext(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_owned(),
        _ => file_name.to_owned(),
    }
}
