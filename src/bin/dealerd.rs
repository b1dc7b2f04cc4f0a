//! dealerd – the dispatcher server binary.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing.
//! 3. Wire repositories, services, and the RPC dispatcher.
//! 4. Start the HTTP server with graceful shutdown.

use dealer::config::Config;
use dealer::dealing::adapters::memory::{
    InMemoryPerformerRepository, InMemoryReportRepository, InMemoryTaskRepository,
};
use dealer::dealing::services::{AdvisoryLocks, LeasingService, ResultVerificationService};
use dealer::rpc::auth::{PerformerAuthorizer, TokenVerifier};
use dealer::rpc::dispatcher::{Dispatcher, DispatcherDeps};
use dealer::rpc::router::{AppState, router};
use dealer::storage::signer::UrlSigner;
use dealer::storage::tool::FileToolRemoteStorage;
use mockable::{Clock, DefaultClock};
use std::sync::Arc;
use tracing::info;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cfg = Config::from_env();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| cfg.log_level.parse::<tracing_subscriber::EnvFilter>())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!(version = env!("CARGO_PKG_VERSION"), "dealerd starting");

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(DefaultClock);
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let performers = Arc::new(InMemoryPerformerRepository::new());
    let reports = Arc::new(InMemoryReportRepository::new());
    let remote = Arc::new(FileToolRemoteStorage::new(
        std::env::var("DEALER_FILE_TOOL").unwrap_or_else(|_| "rclone".to_owned()),
        std::env::var("DEALER_FILE_TOOL_CONFIG").ok(),
    ));

    let dispatcher = Dispatcher::new(DispatcherDeps {
        auth: PerformerAuthorizer::new(
            TokenVerifier::new(cfg.session_secret.as_bytes()),
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
            remote,
            Arc::clone(&clock),
        ),
        signer: Arc::new(UrlSigner::new(
            cfg.storage_providers.clone(),
            Arc::clone(&clock),
        )),
        default_provider: cfg.default_storage_provider.clone(),
        clock,
    });

    let app = router(AppState {
        dispatcher: Arc::new(dispatcher),
    });

    let listener = tokio::net::TcpListener::bind(&cfg.bind_address).await?;
    info!(bind = %cfg.bind_address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
