//! Wire messages for the performer RPC surface.
//!
//! Field names follow the protocol's camelCase convention; the task id
//! travels as `segmentId` on every task-scoped request.

use crate::dealing::domain::{Task, TaskPayload, TaskStep};
use crate::storage::claim::StorageClaim;
use serde::{Deserialize, Serialize};

/// Request to lease one free task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindFreeTaskRequest {
    /// Bearer credential.
    pub authorization: String,
}

/// Live telemetry attached to a progress notification.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryUpdate {
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

/// Progress heartbeat from the lease holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    /// Bearer credential.
    pub authorization: String,
    /// Task identifier.
    pub segment_id: String,
    /// Current phase.
    pub step: TaskStep,
    /// Completion ratio in `[0, 1]`.
    pub progress: f64,
    /// Live transcode telemetry, for convert tasks.
    #[serde(default)]
    pub telemetry: Option<TelemetryUpdate>,
}

/// Request to mark a task finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishTaskRequest {
    /// Bearer credential.
    pub authorization: String,
    /// Task identifier.
    pub segment_id: String,
}

/// Request to release a lease without failing the task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuitTaskRequest {
    /// Bearer credential.
    pub authorization: String,
    /// Task identifier.
    pub segment_id: String,
}

/// Failure report for a held task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailTaskRequest {
    /// Bearer credential.
    pub authorization: String,
    /// Task identifier.
    pub segment_id: String,
    /// Reported failure reasons.
    #[serde(default)]
    pub failures: Vec<String>,
}

/// Request for the task's input storage claim(s).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageClaimRequest {
    /// Bearer credential.
    pub authorization: String,
    /// Task identifier.
    pub segment_id: String,
}

/// Parameters of a leased convert task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertParamsReply {
    /// Remote path of the source media.
    pub input_path: String,
    /// Remote path the result is uploaded under.
    pub output_path: String,
    /// Tokenized transcoder arguments.
    pub opts: Vec<String>,
}

/// A leased task as handed to a performer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReply {
    /// Task identifier.
    pub id: String,
    /// Task kind tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Convert parameters, for convert tasks.
    pub convert_params: Option<ConvertParamsReply>,
}

impl TaskReply {
    /// Presents a task over the wire.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        let convert_params = match task.payload() {
            TaskPayload::Convert(payload) => Some(ConvertParamsReply {
                input_path: payload.input_remote_path.clone(),
                output_path: payload.output_remote_path.clone(),
                opts: payload.opts.clone(),
            }),
            TaskPayload::MediaMeta(_) => None,
        };
        Self {
            id: task.id().to_string(),
            kind: task.payload().kind().to_owned(),
            convert_params,
        }
    }
}

/// A signed storage claim as handed to a performer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageClaimReply {
    /// Claim identifier.
    pub id: String,
    /// Presigned transfer URL.
    pub url: String,
    /// Purpose tag.
    pub purpose: String,
    /// Display name, when recorded.
    pub name: Option<String>,
}

impl StorageClaimReply {
    /// Presents a claim with its signed URL.
    #[must_use]
    pub fn from_claim(claim: &StorageClaim, url: String) -> Self {
        Self {
            id: claim.id().to_string(),
            url,
            purpose: claim.purpose().as_str().to_owned(),
            name: claim.name().map(ToOwned::to_owned),
        }
    }
}

/// All input storage claims of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageClaimListReply {
    /// Signed claims in attachment order.
    pub storage_claims: Vec<StorageClaimReply>,
}

/// Empty reply for acknowledgement-only methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}
