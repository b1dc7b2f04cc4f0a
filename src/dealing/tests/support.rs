//! Shared builders for dealing tests.

use crate::dealing::domain::{
    ConvertPayload, ConvertTelemetry, MediaMetaPayload, Task, TaskPayload, TaskState,
};
use mockable::{Clock, DefaultClock};

/// Builds a convert payload with plausible defaults.
pub fn convert_payload() -> TaskPayload {
    TaskPayload::Convert(ConvertPayload {
        opts: vec!["-i".to_owned(), "input/1.mov".to_owned(), "output/1.mp4".to_owned()],
        input_remote_path: "storage:/r/example/1.mov".to_owned(),
        output_remote_path: "storage:/orders/a/".to_owned(),
        media_meta_report_id: None,
        telemetry: ConvertTelemetry::default(),
    })
}

/// Builds a metadata payload with plausible defaults.
pub fn media_meta_payload() -> TaskPayload {
    TaskPayload::MediaMeta(MediaMetaPayload {
        input_remote_path: "storage:/r/example/1.mov".to_owned(),
        output_remote_path: "storage:/orders/meta/".to_owned(),
        media_meta_report_id: None,
    })
}

/// Builds a convert task already published into the free pool.
pub fn published_task(clock: &DefaultClock) -> Task {
    let mut task = Task::new(convert_payload(), clock);
    task.transition_to(TaskState::Published, clock)
        .unwrap_or_else(|err| panic!("publishing a fresh task must succeed: {err}"));
    task
}

/// Builds a published task created at an explicit instant, for ordering
/// assertions.
pub fn published_task_created_at(
    clock: &DefaultClock,
    created_at: chrono::DateTime<chrono::Utc>,
) -> Task {
    use crate::dealing::domain::{PersistedTaskData, Progress};

    let template = published_task(clock);
    Task::from_persisted(PersistedTaskData {
        id: template.id(),
        payload: template.payload().clone(),
        state: template.state(),
        current_step: None,
        current_progress: Progress::ZERO,
        occupied_at: None,
        occupied_by: None,
        result_verified: false,
        order_id: None,
        selection_item_id: None,
        claims: Vec::new(),
        created_at,
        updated_at: created_at,
    })
}

/// Returns the current instant from the default clock.
pub fn now() -> chrono::DateTime<chrono::Utc> {
    DefaultClock.utc()
}
