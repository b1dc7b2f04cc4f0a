//! Shared wiring for RPC tests: an in-memory dispatcher stack.

use crate::dealing::adapters::memory::{
    InMemoryPerformerRepository, InMemoryReportRepository, InMemoryTaskRepository,
};
use crate::dealing::domain::{
    ConvertPayload, ConvertTelemetry, Task, TaskPayload, TaskState,
};
use crate::dealing::services::{AdvisoryLocks, LeasingService, ResultVerificationService};
use crate::rpc::auth::{PerformerAuthorizer, TokenVerifier, issue_token};
use crate::rpc::dispatcher::{Dispatcher, DispatcherDeps};
use crate::storage::remote::MockRemoteStorage;
use crate::storage::signer::{ProviderConfig, UrlSigner};
use chrono::TimeDelta;
use mockable::DefaultClock;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared HS256 secret used by the test stack.
pub const SECRET: &[u8] = b"test-session-secret";

/// In-memory dispatcher stack for tests.
pub struct RpcHarness {
    /// The dispatcher under test.
    pub dispatcher: Dispatcher,
    /// Backing task repository, for direct seeding and assertions.
    pub tasks: Arc<InMemoryTaskRepository>,
    /// Backing performer repository.
    pub performers: Arc<InMemoryPerformerRepository>,
    /// Clock shared with the dispatcher.
    pub clock: DefaultClock,
}

/// Builds the full dispatcher stack over in-memory adapters.
#[must_use]
pub fn harness() -> RpcHarness {
    harness_with_remote(MockRemoteStorage::new())
}

/// Builds the stack with an explicit remote-storage double.
#[must_use]
pub fn harness_with_remote(remote: MockRemoteStorage) -> RpcHarness {
    let clock: Arc<dyn mockable::Clock + Send + Sync> = Arc::new(DefaultClock);
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let performers = Arc::new(InMemoryPerformerRepository::new());
    let reports = Arc::new(InMemoryReportRepository::new());

    let provider = ProviderConfig {
        endpoint: "https://storage.example.net".to_owned(),
        region: "us-east-1".to_owned(),
        bucket: "dealer-media".to_owned(),
        access_key_id: "AKIDEXAMPLE".to_owned(),
        secret_access_key: "secret".to_owned(),
    };

    let dispatcher = Dispatcher::new(DispatcherDeps {
        auth: PerformerAuthorizer::new(
            TokenVerifier::new(SECRET),
            performers.clone(),
            Arc::clone(&clock),
        ),
        tasks: tasks.clone(),
        leasing: LeasingService::new(
            tasks.clone(),
            Arc::new(AdvisoryLocks::new()),
            Arc::clone(&clock),
        ),
        verification: ResultVerificationService::new(
            tasks.clone(),
            reports,
            Arc::new(remote),
            Arc::clone(&clock),
        ),
        signer: Arc::new(UrlSigner::new(
            HashMap::from([("local".to_owned(), provider)]),
            Arc::clone(&clock),
        )),
        default_provider: "local".to_owned(),
        clock,
    });

    RpcHarness {
        dispatcher,
        tasks,
        performers,
        clock: DefaultClock,
    }
}

/// Mints a valid bearer credential for a worker.
#[must_use]
pub fn token_for(worker_name: &str) -> String {
    issue_token(SECRET, worker_name, TimeDelta::hours(1), &DefaultClock)
        .unwrap_or_else(|err| panic!("minting a test token must succeed: {err}"))
}

/// Builds a published convert task ready for leasing.
#[must_use]
pub fn published_task(clock: &DefaultClock) -> Task {
    let mut task = Task::new(
        TaskPayload::Convert(ConvertPayload {
            opts: vec!["-i".to_owned(), "input/1.mov".to_owned()],
            input_remote_path: "storage:/r/example/1.mov".to_owned(),
            output_remote_path: "storage:/orders/a/".to_owned(),
            media_meta_report_id: None,
            telemetry: ConvertTelemetry::default(),
        }),
        clock,
    );
    task.transition_to(TaskState::Published, clock)
        .unwrap_or_else(|err| panic!("publishing a fresh task must succeed: {err}"));
    task
}
