//! Leasing engine tests: eligibility, TTL expiry, exclusion, and the
//! mutual-exclusion property under concurrent pollers.

use super::support::{now, published_task, published_task_created_at};
use crate::dealing::{
    adapters::memory::InMemoryTaskRepository,
    domain::{Performer, PerformerName, TaskFailure, TaskState},
    ports::TaskRepository,
    services::{AdvisoryLocks, LeasingService},
};
use chrono::TimeDelta;
use eyre::{ensure, eyre};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use std::sync::Arc;

struct Harness {
    tasks: Arc<InMemoryTaskRepository>,
    leasing: Arc<LeasingService>,
    clock: DefaultClock,
}

#[fixture]
fn harness() -> Harness {
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let leasing = Arc::new(LeasingService::new(
        tasks.clone(),
        Arc::new(AdvisoryLocks::new()),
        Arc::new(DefaultClock),
    ));
    Harness {
        tasks,
        leasing,
        clock: DefaultClock,
    }
}

fn performer(name: &str, clock: &DefaultClock) -> Performer {
    let name = PerformerName::new(name)
        .unwrap_or_else(|err| panic!("test performer name must be valid: {err}"));
    Performer::new(name, clock)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn leases_the_only_free_task(harness: Harness) -> eyre::Result<()> {
    let task = published_task(&harness.clock);
    harness.tasks.store(&task).await?;
    let worker = performer("worker-1", &harness.clock);

    let leased = harness
        .leasing
        .find_free_task(&worker)
        .await?
        .ok_or_else(|| eyre!("expected a task"))?;

    ensure!(leased.id() == task.id());
    ensure!(leased.occupied_by() == Some(worker.id()));
    ensure!(leased.is_occupied(now()));

    // The claim is persisted, not just returned.
    let stored = harness
        .tasks
        .find_by_id(task.id())
        .await?
        .ok_or_else(|| eyre!("stored task must exist"))?;
    ensure!(stored.occupied_by() == Some(worker.id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn live_lease_blocks_other_performers(harness: Harness) -> eyre::Result<()> {
    let holder = performer("holder", &harness.clock);
    let mut task = published_task(&harness.clock);
    task.occupy(holder.id(), &harness.clock)?;
    harness.tasks.store(&task).await?;

    let poller = performer("poller", &harness.clock);
    ensure!(harness.leasing.find_free_task(&poller).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expired_lease_is_leasable_again(harness: Harness) -> eyre::Result<()> {
    use crate::dealing::domain::{PersistedTaskData, Progress, Task};

    let holder = performer("holder", &harness.clock);
    let template = published_task(&harness.clock);
    let expired_at = now() - TimeDelta::minutes(3);
    let task = Task::from_persisted(PersistedTaskData {
        id: template.id(),
        payload: template.payload().clone(),
        state: TaskState::Published,
        current_step: None,
        current_progress: Progress::ZERO,
        occupied_at: Some(expired_at),
        occupied_by: Some(holder.id()),
        result_verified: false,
        order_id: None,
        selection_item_id: None,
        claims: Vec::new(),
        created_at: expired_at,
        updated_at: expired_at,
    });
    harness.tasks.store(&task).await?;

    let poller = performer("poller", &harness.clock);
    let leased = harness
        .leasing
        .find_free_task(&poller)
        .await?
        .ok_or_else(|| eyre!("expired lease must free the task"))?;
    ensure!(leased.id() == task.id());
    ensure!(leased.occupied_by() == Some(poller.id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failure_exclusion_is_performer_scoped(harness: Harness) -> eyre::Result<()> {
    let task = published_task(&harness.clock);
    harness.tasks.store(&task).await?;

    let failer = performer("failer", &harness.clock);
    let failure = TaskFailure::reported(task.id(), failer.id(), "decode error", &harness.clock);
    harness.tasks.record_failure(&failure).await?;

    ensure!(harness.leasing.find_free_task(&failer).await?.is_none());

    let other = performer("other", &harness.clock);
    let leased = harness
        .leasing
        .find_free_task(&other)
        .await?
        .ok_or_else(|| eyre!("another performer must still lease the task"))?;
    ensure!(leased.id() == task.id());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_tasks_are_reoffered_to_other_performers(harness: Harness) -> eyre::Result<()> {
    let mut task = published_task(&harness.clock);
    task.transition_to(TaskState::Failed, &harness.clock)?;
    harness.tasks.store(&task).await?;

    let poller = performer("poller", &harness.clock);
    let leased = harness
        .leasing
        .find_free_task(&poller)
        .await?
        .ok_or_else(|| eyre!("failed task must stay leasable"))?;
    ensure!(leased.id() == task.id());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn oldest_created_task_wins_ties(harness: Harness) -> eyre::Result<()> {
    let newer = published_task_created_at(&harness.clock, now() - TimeDelta::minutes(1));
    let older = published_task_created_at(&harness.clock, now() - TimeDelta::minutes(30));
    harness.tasks.store(&newer).await?;
    harness.tasks.store(&older).await?;

    let poller = performer("poller", &harness.clock);
    let leased = harness
        .leasing
        .find_free_task(&poller)
        .await?
        .ok_or_else(|| eyre!("expected a task"))?;
    ensure!(leased.id() == older.id());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exactly_one_of_many_concurrent_pollers_wins(harness: Harness) -> eyre::Result<()> {
    let task = published_task(&harness.clock);
    harness.tasks.store(&task).await?;

    let mut handles = Vec::new();
    for index in 0..16 {
        let leasing = Arc::clone(&harness.leasing);
        let poller = performer(&format!("poller-{index}"), &harness.clock);
        handles.push(tokio::spawn(
            async move { leasing.find_free_task(&poller).await },
        ));
    }

    let mut wins = 0;
    let mut misses = 0;
    for handle in handles {
        match handle.await? {
            Ok(Some(_)) => wins += 1,
            Ok(None) => misses += 1,
            Err(err) => return Err(eyre!("leasing must not error: {err}")),
        }
    }

    ensure!(wins == 1, "exactly one poller may win, got {wins}");
    ensure!(misses == 15);
    Ok(())
}
