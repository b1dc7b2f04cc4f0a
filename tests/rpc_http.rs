//! HTTP-level smoke tests: the router serves each method as a JSON POST
//! endpoint and renders typed errors with their wire codes.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::TimeDelta;
use dealer::dealing::adapters::memory::{
    InMemoryPerformerRepository, InMemoryReportRepository, InMemoryTaskRepository,
};
use dealer::dealing::domain::{
    ConvertPayload, ConvertTelemetry, Task, TaskPayload, TaskState,
};
use dealer::dealing::ports::TaskRepository;
use dealer::dealing::services::{AdvisoryLocks, LeasingService, ResultVerificationService};
use dealer::rpc::auth::{PerformerAuthorizer, TokenVerifier, issue_token};
use dealer::rpc::dispatcher::{Dispatcher, DispatcherDeps};
use dealer::rpc::router::{AppState, router};
use dealer::storage::remote::{RemoteEntry, RemoteStorage, RemoteStorageError};
use dealer::storage::signer::{ProviderConfig, UrlSigner};
use eyre::{ensure, eyre};
use http_body_util::BodyExt;
use mockable::{Clock, DefaultClock};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;

const SECRET: &[u8] = b"http-secret";

struct NoRemote;

#[async_trait]
impl RemoteStorage for NoRemote {
    async fn list(&self, _path: &str) -> Result<Vec<RemoteEntry>, RemoteStorageError> {
        Ok(Vec::new())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, RemoteStorageError> {
        Err(RemoteStorageError::NotFound(path.to_owned()))
    }
}

fn app(tasks: Arc<InMemoryTaskRepository>) -> axum::Router {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(DefaultClock);
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
            performers,
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
            Arc::new(NoRemote),
            Arc::clone(&clock),
        ),
        signer: Arc::new(UrlSigner::new(
            HashMap::from([("local".to_owned(), provider)]),
            Arc::clone(&clock),
        )),
        default_provider: "local".to_owned(),
        clock,
    });

    router(AppState {
        dispatcher: Arc::new(dispatcher),
    })
}

fn token(worker: &str) -> String {
    issue_token(SECRET, worker, TimeDelta::hours(1), &DefaultClock)
        .unwrap_or_else(|err| panic!("minting a test token must succeed: {err}"))
}

fn published_task() -> Task {
    let clock = DefaultClock;
    let mut task = Task::new(
        TaskPayload::Convert(ConvertPayload {
            opts: vec!["-i".to_owned(), "input/1.mov".to_owned()],
            input_remote_path: "storage:/r/example/1.mov".to_owned(),
            output_remote_path: "storage:/orders/a/".to_owned(),
            media_meta_report_id: None,
            telemetry: ConvertTelemetry::default(),
        }),
        &clock,
    );
    task.transition_to(TaskState::Published, &clock)
        .unwrap_or_else(|err| panic!("publishing a fresh task must succeed: {err}"));
    task
}

async fn post(app: axum::Router, path: &str, body: Value) -> eyre::Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body)?))?;
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let value = serde_json::from_slice(&bytes)?;
    Ok((status, value))
}

#[tokio::test(flavor = "multi_thread")]
async fn find_free_task_round_trips_over_http() -> eyre::Result<()> {
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let task = published_task();
    tasks.store(&task).await?;
    let app = app(tasks);

    let (status, body) = post(
        app,
        "/rpc/dealer.Dealer/FindFreeTask",
        json!({ "authorization": token("worker-1") }),
    )
    .await?;

    ensure!(status == StatusCode::OK);
    ensure!(body["id"] == json!(task.id().to_string()));
    ensure!(body["type"] == json!("convert"));
    ensure!(body["convertParams"]["inputPath"] == json!("storage:/r/example/1.mov"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_pool_renders_the_not_found_code() -> eyre::Result<()> {
    let app = app(Arc::new(InMemoryTaskRepository::new()));

    let (status, body) = post(
        app,
        "/rpc/dealer.Dealer/FindFreeTask",
        json!({ "authorization": token("worker-1") }),
    )
    .await?;

    ensure!(status == StatusCode::NOT_FOUND);
    ensure!(body["code"] == json!("not_found"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_credential_renders_the_permission_denied_code() -> eyre::Result<()> {
    let app = app(Arc::new(InMemoryTaskRepository::new()));

    let (status, body) = post(
        app,
        "/rpc/dealer.Dealer/FindFreeTask",
        json!({ "authorization": "Bearer garbage" }),
    )
    .await?;

    ensure!(status == StatusCode::FORBIDDEN);
    ensure!(body["code"] == json!("permission_denied"));
    ensure!(body["msg"].is_string());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn notify_round_trips_over_http() -> eyre::Result<()> {
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let task = published_task();
    tasks.store(&task).await?;
    let app = app(tasks.clone());

    let (status, _) = post(
        app.clone(),
        "/rpc/dealer.Dealer/FindFreeTask",
        json!({ "authorization": token("worker-1") }),
    )
    .await?;
    ensure!(status == StatusCode::OK);

    let (status, _) = post(
        app,
        "/rpc/dealer.Dealer/Notify",
        json!({
            "authorization": token("worker-1"),
            "segmentId": task.id().to_string(),
            "step": "processing",
            "progress": 0.25,
            "telemetry": { "fps": 23.976, "frame": 120 }
        }),
    )
    .await?;
    ensure!(status == StatusCode::OK);

    let stored = tasks
        .find_by_id(task.id())
        .await?
        .ok_or_else(|| eyre!("task must persist"))?;
    ensure!((stored.current_progress().value() - 0.25).abs() < f64::EPSILON);
    Ok(())
}
