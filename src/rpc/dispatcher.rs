//! Per-method RPC handlers behind the shared guard pipeline.
//!
//! Each method composes an ordered chain of guards (authenticate, resolve
//! task, authorize ownership, reject cancelled) around its execute step;
//! every guard short-circuits by returning a typed [`RpcError`]. Expected
//! domain conditions travel to the caller as typed errors, while
//! unanticipated internal failures are logged in full and masked as opaque
//! `unknown` errors.

use crate::dealing::domain::{Performer, Progress, Task, TaskFailure, TaskId, TaskState};
use crate::dealing::ports::DynTaskRepository;
use crate::dealing::services::{LeasingError, LeasingService, ResultVerificationService};
use crate::rpc::auth::PerformerAuthorizer;
use crate::rpc::error::RpcError;
use crate::rpc::messages::{
    Empty, FailTaskRequest, FindFreeTaskRequest, FinishTaskRequest, NotifyRequest, QuitTaskRequest,
    StorageClaimListReply, StorageClaimReply, StorageClaimRequest, TaskReply,
};
use crate::storage::claim::StorageClaim;
use crate::storage::signer::UrlSigner;
use mockable::Clock;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// Dependencies of the RPC dispatcher.
pub struct DispatcherDeps {
    /// Performer authentication chain.
    pub auth: PerformerAuthorizer,
    /// Task persistence.
    pub tasks: DynTaskRepository,
    /// Free-task leasing engine.
    pub leasing: LeasingService,
    /// Result verification run on finish.
    pub verification: ResultVerificationService,
    /// Storage claim URL issuer.
    pub signer: Arc<UrlSigner>,
    /// Provider fresh output claims are allocated against.
    pub default_provider: String,
    /// Server-side time source.
    pub clock: Arc<dyn Clock + Send + Sync>,
}

/// Stateless handler set invoked concurrently per inbound RPC call.
pub struct Dispatcher {
    auth: PerformerAuthorizer,
    tasks: DynTaskRepository,
    leasing: LeasingService,
    verification: ResultVerificationService,
    signer: Arc<UrlSigner>,
    default_provider: String,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Dispatcher {
    /// Creates a dispatcher from its dependency bundle.
    #[must_use]
    pub fn new(deps: DispatcherDeps) -> Self {
        Self {
            auth: deps.auth,
            tasks: deps.tasks,
            leasing: deps.leasing,
            verification: deps.verification,
            signer: deps.signer,
            default_provider: deps.default_provider,
            clock: deps.clock,
        }
    }

    /// Leases one free task for the calling performer.
    ///
    /// # Errors
    ///
    /// `NotFound` when no task is free, `InvalidArgument` when the
    /// claim-write fails validation.
    pub async fn find_free_task(&self, req: FindFreeTaskRequest) -> Result<TaskReply, RpcError> {
        let performer = self.auth.authenticate(&req.authorization).await?;

        match self.leasing.find_free_task(&performer).await {
            Ok(Some(task)) => Ok(TaskReply::from_task(&task)),
            Ok(None) => Err(RpcError::not_found("free task not found")),
            Err(LeasingError::Validation(message)) => Err(RpcError::invalid_argument(message)),
            Err(err) => Err(internal("find_free_task", &err)),
        }
    }

    /// Records a progress heartbeat and refreshes the caller's lease.
    ///
    /// # Errors
    ///
    /// `Unknown` when the progress value is out of range or persistence
    /// fails.
    pub async fn notify(&self, req: NotifyRequest) -> Result<Empty, RpcError> {
        let performer = self.auth.authenticate(&req.authorization).await?;
        let mut task = self.resolve_task(&req.segment_id).await?;
        authorize_ownership(&task, &performer)?;

        let progress = Progress::new(req.progress).map_err(|err| RpcError::unknown(err.to_string()))?;
        task.record_progress(req.step, progress, &*self.clock);
        if let Some(update) = req.telemetry {
            task.record_telemetry(
                crate::dealing::domain::ConvertTelemetry {
                    bitrate: update.bitrate,
                    fps: update.fps,
                    frame: update.frame,
                    speed: update.speed,
                    time: update.time,
                },
                &*self.clock,
            );
        }
        task.refresh_lease(performer.id(), &*self.clock);

        self.tasks
            .update(&task)
            .await
            .map_err(|err| internal("notify", &err))?;
        Ok(Empty {})
    }

    /// Finishes the held task, running result verification.
    ///
    /// # Errors
    ///
    /// `Unknown` when the task is cancelled or persistence fails.
    pub async fn finish_task(&self, req: FinishTaskRequest) -> Result<Empty, RpcError> {
        let performer = self.auth.authenticate(&req.authorization).await?;
        let mut task = self.resolve_task(&req.segment_id).await?;
        authorize_ownership(&task, &performer)?;
        reject_cancelled(&task)?;

        self.verification
            .finish(&mut task)
            .await
            .map_err(|err| internal("finish_task", &err))?;
        Ok(Empty {})
    }

    /// Releases the caller's lease, returning the task to the free pool.
    ///
    /// # Errors
    ///
    /// `Unknown` when the task cannot be requeued or persistence fails.
    pub async fn quit_task(&self, req: QuitTaskRequest) -> Result<Empty, RpcError> {
        let performer = self.auth.authenticate(&req.authorization).await?;
        let mut task = self.resolve_task(&req.segment_id).await?;
        authorize_ownership(&task, &performer)?;

        task.requeue(&*self.clock)
            .map_err(|err| RpcError::unknown(err.to_string()))?;
        self.tasks
            .update(&task)
            .await
            .map_err(|err| internal("quit_task", &err))?;
        Ok(Empty {})
    }

    /// Fails the held task, recording a failure for the caller.
    ///
    /// # Errors
    ///
    /// `Unknown` when the task is cancelled, the transition is rejected,
    /// or persistence fails.
    pub async fn fail_task(&self, req: FailTaskRequest) -> Result<Empty, RpcError> {
        let performer = self.auth.authenticate(&req.authorization).await?;
        let mut task = self.resolve_task(&req.segment_id).await?;
        authorize_ownership(&task, &performer)?;
        reject_cancelled(&task)?;

        task.transition_to(TaskState::Failed, &*self.clock)
            .map_err(|err| RpcError::unknown(err.to_string()))?;
        let failure = TaskFailure::reported(
            task.id(),
            performer.id(),
            req.failures.join(", "),
            &*self.clock,
        );

        self.tasks
            .record_failure(&failure)
            .await
            .map_err(|err| internal("fail_task", &err))?;
        self.tasks
            .update(&task)
            .await
            .map_err(|err| internal("fail_task", &err))?;
        Ok(Empty {})
    }

    /// Signs a download URL for the task's input storage claim.
    ///
    /// # Errors
    ///
    /// `NotFound` when the task has no input claim.
    pub async fn get_input_storage_claim(
        &self,
        req: StorageClaimRequest,
    ) -> Result<StorageClaimReply, RpcError> {
        let performer = self.auth.authenticate(&req.authorization).await?;
        let task = self.resolve_task(&req.segment_id).await?;
        authorize_ownership(&task, &performer)?;

        let claim = task
            .input_claims()
            .next()
            .ok_or_else(|| RpcError::not_found("storage claim not found"))?;
        let url = self
            .signer
            .get(claim, UrlSigner::default_url_ttl())
            .map_err(|err| internal("get_input_storage_claim", &err))?;
        Ok(StorageClaimReply::from_claim(claim, url))
    }

    /// Signs download URLs for all of the task's input storage claims.
    ///
    /// # Errors
    ///
    /// `NotFound` when the task has no input claims.
    pub async fn get_all_input_storage_claims(
        &self,
        req: StorageClaimRequest,
    ) -> Result<StorageClaimListReply, RpcError> {
        let performer = self.auth.authenticate(&req.authorization).await?;
        let task = self.resolve_task(&req.segment_id).await?;
        authorize_ownership(&task, &performer)?;

        let claims: Vec<&StorageClaim> = task.input_claims().collect();
        if claims.is_empty() {
            return Err(RpcError::not_found("storage claims not found"));
        }

        let mut storage_claims = Vec::with_capacity(claims.len());
        for claim in claims {
            let url = self
                .signer
                .get(claim, UrlSigner::default_url_ttl())
                .map_err(|err| internal("get_all_input_storage_claims", &err))?;
            storage_claims.push(StorageClaimReply::from_claim(claim, url));
        }
        Ok(StorageClaimListReply { storage_claims })
    }

    /// Allocates a fresh output storage claim and signs an upload URL.
    ///
    /// # Errors
    ///
    /// `Unknown` when persistence fails.
    pub async fn allocate_output_storage_claim(
        &self,
        req: StorageClaimRequest,
    ) -> Result<StorageClaimReply, RpcError> {
        let performer = self.auth.authenticate(&req.authorization).await?;
        let mut task = self.resolve_task(&req.segment_id).await?;
        authorize_ownership(&task, &performer)?;

        let claim = StorageClaim::allocate_output(self.default_provider.as_str());
        task.attach_claim(claim.clone(), &*self.clock);
        self.tasks
            .update(&task)
            .await
            .map_err(|err| internal("allocate_output_storage_claim", &err))?;

        let url = self
            .signer
            .put(&claim, UrlSigner::default_url_ttl())
            .map_err(|err| internal("allocate_output_storage_claim", &err))?;
        Ok(StorageClaimReply::from_claim(&claim, url))
    }

    /// Resolves the task a request is scoped to.
    async fn resolve_task(&self, segment_id: &str) -> Result<Task, RpcError> {
        let id = segment_id
            .parse::<Uuid>()
            .map(TaskId::from_uuid)
            .map_err(|_| RpcError::not_found("task not found"))?;
        self.tasks
            .find_by_id(id)
            .await
            .map_err(|err| internal("resolve_task", &err))?
            .ok_or_else(|| RpcError::not_found("task not found"))
    }
}

/// Ownership guard: the stored lease holder must be the caller.
fn authorize_ownership(task: &Task, performer: &Performer) -> Result<(), RpcError> {
    if task.occupied_by() == Some(performer.id()) {
        Ok(())
    } else {
        Err(RpcError::permission_denied("performer mismatch"))
    }
}

/// Cancelled-task guard for mutating methods.
fn reject_cancelled(task: &Task) -> Result<(), RpcError> {
    if task.state() == TaskState::Cancelled {
        Err(RpcError::unknown("task cancelled"))
    } else {
        Ok(())
    }
}

/// Logs an internal failure in full and masks it for the wire.
fn internal(method: &str, err: &dyn std::fmt::Display) -> RpcError {
    error!(method, error = %err, "rpc handler internal error");
    RpcError::unknown("internal error")
}
