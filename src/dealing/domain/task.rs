//! Task aggregate root: the unit of leasable transcoding work.

use super::{
    DealingDomainError, OrderId, ParseTaskStateError, ParseTaskStepError, PerformerId, Progress,
    ReportId, SelectionItemId, TaskId,
};
use crate::storage::claim::{ClaimRole, StorageClaim};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Task exists but is not yet offered to performers.
    Created,
    /// Task is in the free pool (or currently leased).
    Published,
    /// Task was withdrawn and will never run.
    Cancelled,
    /// Task completed and its result was accepted.
    Finished,
    /// Task execution failed; other performers may retry it.
    Failed,
}

impl TaskState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }

    /// Returns whether the state permits transitioning to `target`.
    ///
    /// The machine only moves forward, except that a failed task may be
    /// re-published for retry by another performer.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Published | Self::Cancelled)
                | (Self::Published, Self::Cancelled | Self::Finished | Self::Failed)
                | (Self::Failed, Self::Published | Self::Cancelled)
        )
    }

    /// Returns whether the state admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Returns whether tasks in this state are eligible for leasing.
    ///
    /// Failed tasks stay in the pool for performers other than the ones
    /// that already failed them.
    #[must_use]
    pub const fn is_leasable(self) -> bool {
        matches!(self, Self::Published | Self::Failed)
    }
}

impl TryFrom<&str> for TaskState {
    type Error = ParseTaskStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "created" => Ok(Self::Created),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseTaskStateError(value.to_owned())),
        }
    }
}

/// Coarse phase a performer reports while holding a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStep {
    /// Fetching source media from storage.
    DownloadingInput,
    /// Running the transcode/probe itself.
    Processing,
    /// Uploading the result to storage.
    UploadingOutput,
}

impl TaskStep {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DownloadingInput => "downloading_input",
            Self::Processing => "processing",
            Self::UploadingOutput => "uploading_output",
        }
    }
}

impl TryFrom<&str> for TaskStep {
    type Error = ParseTaskStepError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "downloading_input" => Ok(Self::DownloadingInput),
            "processing" => Ok(Self::Processing),
            "uploading_output" => Ok(Self::UploadingOutput),
            _ => Err(ParseTaskStepError(value.to_owned())),
        }
    }
}

/// Live transcode telemetry reported by convert performers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvertTelemetry {
    /// Current encoder bitrate, kbit/s.
    pub bitrate: Option<f64>,
    /// Current frames per second.
    pub fps: Option<f64>,
    /// Last processed frame number.
    pub frame: Option<i64>,
    /// Encoding speed relative to realtime.
    pub speed: Option<f64>,
    /// Processed media time, milliseconds.
    pub time: Option<i64>,
}

/// Parameters of a convert task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertPayload {
    /// Tokenized transcoder arguments.
    pub opts: Vec<String>,
    /// Remote path of the source media.
    pub input_remote_path: String,
    /// Remote path the result is uploaded under.
    pub output_remote_path: String,
    /// Probe report for the source file, when one was already computed.
    pub media_meta_report_id: Option<ReportId>,
    /// Live telemetry from the current lease holder.
    pub telemetry: ConvertTelemetry,
}

/// Parameters of a metadata-extraction task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetaPayload {
    /// Remote path of the probed media.
    pub input_remote_path: String,
    /// Remote path the probe report JSON is uploaded under.
    pub output_remote_path: String,
    /// Report produced by result verification, once available.
    pub media_meta_report_id: Option<ReportId>,
}

/// Type-specific task parameters, dispatched on the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Transcode one source file.
    Convert(ConvertPayload),
    /// Extract metadata from one source file.
    MediaMeta(MediaMetaPayload),
}

impl TaskPayload {
    /// Returns the canonical kind tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Convert(_) => "convert",
            Self::MediaMeta(_) => "media_meta",
        }
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    payload: TaskPayload,
    state: TaskState,
    current_step: Option<TaskStep>,
    current_progress: Progress,
    occupied_at: Option<DateTime<Utc>>,
    occupied_by: Option<PerformerId>,
    result_verified: bool,
    order_id: Option<OrderId>,
    selection_item_id: Option<SelectionItemId>,
    claims: Vec<StorageClaim>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted type-specific parameters.
    pub payload: TaskPayload,
    /// Persisted lifecycle state.
    pub state: TaskState,
    /// Persisted current step, if any.
    pub current_step: Option<TaskStep>,
    /// Persisted progress ratio.
    pub current_progress: Progress,
    /// Persisted lease timestamp, if any.
    pub occupied_at: Option<DateTime<Utc>>,
    /// Persisted lease holder, if any.
    pub occupied_by: Option<PerformerId>,
    /// Persisted verification flag.
    pub result_verified: bool,
    /// Persisted owning order, if any.
    pub order_id: Option<OrderId>,
    /// Persisted source selection item, if any.
    pub selection_item_id: Option<SelectionItemId>,
    /// Persisted storage claims.
    pub claims: Vec<StorageClaim>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Lease duration after which an occupation silently expires.
    #[must_use]
    pub fn occupation_ttl() -> TimeDelta {
        TimeDelta::minutes(2)
    }

    /// Creates a new ad-hoc task in `created` state.
    #[must_use]
    pub fn new(payload: TaskPayload, clock: &(impl Clock + ?Sized)) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            payload,
            state: TaskState::Created,
            current_step: None,
            current_progress: Progress::ZERO,
            occupied_at: None,
            occupied_by: None,
            result_verified: false,
            order_id: None,
            selection_item_id: None,
            claims: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Creates a task owned by an order, linked to its source file.
    #[must_use]
    pub fn for_order(
        payload: TaskPayload,
        order_id: OrderId,
        selection_item_id: SelectionItemId,
        clock: &(impl Clock + ?Sized),
    ) -> Self {
        let mut task = Self::new(payload, clock);
        task.order_id = Some(order_id);
        task.selection_item_id = Some(selection_item_id);
        task
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            payload: data.payload,
            state: data.state,
            current_step: data.current_step,
            current_progress: data.current_progress,
            occupied_at: data.occupied_at,
            occupied_by: data.occupied_by,
            result_verified: data.result_verified,
            order_id: data.order_id,
            selection_item_id: data.selection_item_id,
            claims: data.claims,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the type-specific parameters.
    #[must_use]
    pub const fn payload(&self) -> &TaskPayload {
        &self.payload
    }

    /// Returns the task lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns the step last reported by the lease holder.
    #[must_use]
    pub const fn current_step(&self) -> Option<TaskStep> {
        self.current_step
    }

    /// Returns the progress last reported by the lease holder.
    #[must_use]
    pub const fn current_progress(&self) -> Progress {
        self.current_progress
    }

    /// Returns the raw lease timestamp, expired or not.
    #[must_use]
    pub const fn occupied_at(&self) -> Option<DateTime<Utc>> {
        self.occupied_at
    }

    /// Returns the raw lease holder, expired or not.
    #[must_use]
    pub const fn occupied_by(&self) -> Option<PerformerId> {
        self.occupied_by
    }

    /// Returns whether result verification accepted the task output.
    #[must_use]
    pub const fn result_verified(&self) -> bool {
        self.result_verified
    }

    /// Returns the owning order, if any.
    #[must_use]
    pub const fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    /// Returns the source selection item, if any.
    #[must_use]
    pub const fn selection_item_id(&self) -> Option<SelectionItemId> {
        self.selection_item_id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether a live lease exists at `now`.
    ///
    /// Occupancy is derived, never stored: a lease older than the TTL has
    /// expired and the task counts as free without any sweeper running.
    #[must_use]
    pub fn is_occupied(&self, now: DateTime<Utc>) -> bool {
        match (self.occupied_by, self.occupied_at) {
            (Some(_), Some(at)) => at > now - Self::occupation_ttl(),
            _ => false,
        }
    }

    /// Returns the holder of a live lease at `now`, if any.
    #[must_use]
    pub fn occupier(&self, now: DateTime<Utc>) -> Option<PerformerId> {
        if self.is_occupied(now) {
            self.occupied_by
        } else {
            None
        }
    }

    /// Claims the task for a performer, stamping the lease server-side.
    ///
    /// # Errors
    ///
    /// Returns [`DealingDomainError::NotLeasable`] when the task state does
    /// not admit leasing.
    pub fn occupy(
        &mut self,
        performer_id: PerformerId,
        clock: &(impl Clock + ?Sized),
    ) -> Result<(), DealingDomainError> {
        if !self.state.is_leasable() {
            return Err(DealingDomainError::NotLeasable {
                task_id: self.id,
                state: self.state,
            });
        }
        self.occupied_at = Some(clock.utc());
        self.occupied_by = Some(performer_id);
        self.touch(clock);
        Ok(())
    }

    /// Re-stamps the lease for the current holder on heartbeat.
    pub fn refresh_lease(&mut self, performer_id: PerformerId, clock: &(impl Clock + ?Sized)) {
        self.occupied_at = Some(clock.utc());
        self.occupied_by = Some(performer_id);
        self.touch(clock);
    }

    /// Clears the lease without touching the state.
    pub fn release(&mut self, clock: &(impl Clock + ?Sized)) {
        self.occupied_at = None;
        self.occupied_by = None;
        self.touch(clock);
    }

    /// Moves the task to a new lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns [`DealingDomainError::InvalidStateTransition`] when the
    /// machine forbids the move; the task is left unchanged.
    pub fn transition_to(
        &mut self,
        target: TaskState,
        clock: &(impl Clock + ?Sized),
    ) -> Result<(), DealingDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(DealingDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        self.touch(clock);
        Ok(())
    }

    /// Returns the task to the free pool, releasing the lease.
    ///
    /// A published task stays published; a failed task is re-published.
    ///
    /// # Errors
    ///
    /// Returns [`DealingDomainError::InvalidStateTransition`] when the task
    /// is not in a requeueable state.
    pub fn requeue(&mut self, clock: &(impl Clock + ?Sized)) -> Result<(), DealingDomainError> {
        match self.state {
            TaskState::Published => {}
            TaskState::Failed => self.state = TaskState::Published,
            other => {
                return Err(DealingDomainError::InvalidStateTransition {
                    task_id: self.id,
                    from: other,
                    to: TaskState::Published,
                });
            }
        }
        self.occupied_at = None;
        self.occupied_by = None;
        self.touch(clock);
        Ok(())
    }

    /// Records a progress report from the lease holder.
    pub fn record_progress(
        &mut self,
        step: TaskStep,
        progress: Progress,
        clock: &(impl Clock + ?Sized),
    ) {
        self.current_step = Some(step);
        self.current_progress = progress;
        self.touch(clock);
    }

    /// Merges live telemetry into a convert payload; ignored for other
    /// task kinds.
    pub fn record_telemetry(&mut self, telemetry: ConvertTelemetry, clock: &(impl Clock + ?Sized)) {
        if let TaskPayload::Convert(payload) = &mut self.payload {
            payload.telemetry = telemetry;
            self.touch(clock);
        }
    }

    /// Marks the task result as verified.
    pub fn mark_result_verified(&mut self, clock: &(impl Clock + ?Sized)) {
        self.result_verified = true;
        self.touch(clock);
    }

    /// Links the payload to a probe report.
    pub fn link_report(&mut self, report_id: ReportId, clock: &(impl Clock + ?Sized)) {
        match &mut self.payload {
            TaskPayload::Convert(payload) => payload.media_meta_report_id = Some(report_id),
            TaskPayload::MediaMeta(payload) => payload.media_meta_report_id = Some(report_id),
        }
        self.touch(clock);
    }

    /// Replaces the type-specific parameters (idempotent re-expansion).
    pub fn replace_payload(&mut self, payload: TaskPayload, clock: &(impl Clock + ?Sized)) {
        self.payload = payload;
        self.touch(clock);
    }

    /// Attaches a storage claim to the task.
    pub fn attach_claim(&mut self, claim: StorageClaim, clock: &(impl Clock + ?Sized)) {
        self.claims.push(claim);
        self.touch(clock);
    }

    /// Returns all claims attached to the task.
    #[must_use]
    pub fn claims(&self) -> &[StorageClaim] {
        &self.claims
    }

    /// Returns the input claims in attachment order.
    pub fn input_claims(&self) -> impl Iterator<Item = &StorageClaim> {
        self.claims
            .iter()
            .filter(|claim| claim.role() == ClaimRole::Input)
    }

    /// Returns the output claims in attachment order.
    pub fn output_claims(&self) -> impl Iterator<Item = &StorageClaim> {
        self.claims
            .iter()
            .filter(|claim| claim.role() == ClaimRole::Output)
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &(impl Clock + ?Sized)) {
        self.updated_at = clock.utc();
    }
}
