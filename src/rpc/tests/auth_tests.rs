//! Bearer-token verification and performer resolution tests.

use super::support::{SECRET, harness, token_for};
use crate::dealing::ports::PerformerRepository;
use crate::rpc::auth::issue_token;
use crate::rpc::error::RpcError;
use chrono::TimeDelta;
use eyre::ensure;
use mockable::DefaultClock;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn valid_token_creates_the_performer_on_first_sight() -> eyre::Result<()> {
    let stack = harness();

    // No performer exists until the first authenticated call.
    ensure!(stack.performers.find_by_name("worker-1").await?.is_none());

    let request = crate::rpc::messages::FindFreeTaskRequest {
        authorization: format!("Bearer {}", token_for("worker-1")),
    };
    // NotFound here means authentication passed and leasing found nothing.
    let result = stack.dispatcher.find_free_task(request).await;
    ensure!(matches!(result, Err(RpcError::NotFound(_))));

    let created = stack.performers.find_by_name("worker-1").await?;
    ensure!(created.is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_calls_reuse_the_performer_identity() -> eyre::Result<()> {
    let stack = harness();
    let request = || crate::rpc::messages::FindFreeTaskRequest {
        authorization: token_for("worker-1"),
    };

    let _ = stack.dispatcher.find_free_task(request()).await;
    let first = stack.performers.find_by_name("worker-1").await?;
    let _ = stack.dispatcher.find_free_task(request()).await;
    let second = stack.performers.find_by_name("worker-1").await?;

    ensure!(first.is_some());
    ensure!(first.as_ref().map(|p| p.id()) == second.as_ref().map(|p| p.id()));
    Ok(())
}

#[rstest]
#[case::garbage("not-a-token")]
#[case::empty("")]
#[case::bearer_only("Bearer ")]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_credentials_are_denied(#[case] authorization: &str) {
    let stack = harness();
    let request = crate::rpc::messages::FindFreeTaskRequest {
        authorization: authorization.to_owned(),
    };

    let result = stack.dispatcher.find_free_task(request).await;

    assert!(matches!(result, Err(RpcError::PermissionDenied(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn foreign_signature_is_denied() -> eyre::Result<()> {
    let stack = harness();
    let forged = issue_token(
        b"some-other-secret",
        "worker-1",
        TimeDelta::hours(1),
        &DefaultClock,
    )?;
    let request = crate::rpc::messages::FindFreeTaskRequest {
        authorization: forged,
    };

    let result = stack.dispatcher.find_free_task(request).await;
    ensure!(matches!(result, Err(RpcError::PermissionDenied(_))));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expired_token_is_denied() -> eyre::Result<()> {
    let stack = harness();
    let expired = issue_token(SECRET, "worker-1", TimeDelta::hours(-2), &DefaultClock)?;
    let request = crate::rpc::messages::FindFreeTaskRequest {
        authorization: expired,
    };

    let result = stack.dispatcher.find_free_task(request).await;
    ensure!(matches!(result, Err(RpcError::PermissionDenied(_))));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn token_without_a_worker_name_is_denied() -> eyre::Result<()> {
    let stack = harness();
    let anonymous = issue_token(SECRET, "  ", TimeDelta::hours(1), &DefaultClock)?;
    let request = crate::rpc::messages::FindFreeTaskRequest {
        authorization: anonymous,
    };

    let result = stack.dispatcher.find_free_task(request).await;
    ensure!(matches!(result, Err(RpcError::PermissionDenied(_))));
    Ok(())
}
