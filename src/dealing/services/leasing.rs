//! Free-task leasing under a named mutual-exclusion section.
//!
//! The eligibility query and the claim-write are not one atomic storage
//! operation, so every search-and-claim runs inside the process-wide
//! section named [`FIND_FREE_TASK_SECTION`]. Two pollers observing the
//! same snapshot would otherwise both claim the same task. The section
//! serializes *all* leasing attempts, not just same-task ones; lease
//! acquisition is rare next to task duration, so the bottleneck is paid
//! for correctness.

use crate::dealing::{
    domain::{DealingDomainError, Performer, Task},
    ports::{DynTaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::sync::Mutex;

/// Name of the advisory section serializing search-and-claim.
pub const FIND_FREE_TASK_SECTION: &str = "find_free_task";

/// Process-wide registry of named mutual-exclusion sections.
///
/// One registry instance is shared per process; a horizontally scaled
/// deployment swaps this for a distributed lock behind the same call
/// sites.
#[derive(Debug, Default)]
pub struct AdvisoryLocks {
    sections: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AdvisoryLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex backing a named section, creating it on first use.
    ///
    /// Returns a poisoned-registry fallback section if the registry mutex
    /// was poisoned; exclusion still holds for all callers taking the same
    /// path.
    #[must_use]
    pub fn section(&self, name: &str) -> Arc<Mutex<()>> {
        match self.sections.lock() {
            Ok(mut sections) => Arc::clone(
                sections
                    .entry(name.to_owned())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            ),
            Err(poisoned) => {
                let mut sections = poisoned.into_inner();
                Arc::clone(
                    sections
                        .entry(name.to_owned())
                        .or_insert_with(|| Arc::new(Mutex::new(()))),
                )
            }
        }
    }
}

/// Errors returned by the leasing engine.
///
/// Callers must distinguish validation failure (retry with backoff) from
/// "no task" (`Ok(None)`, retry on the poll interval).
#[derive(Debug, Error)]
pub enum LeasingError {
    /// The claim-write failed domain validation.
    #[error("leasing validation failed: {0}")]
    Validation(String),

    /// The repository rejected the search or the claim-write.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
}

/// The free-task leasing engine.
pub struct LeasingService {
    tasks: DynTaskRepository,
    locks: Arc<AdvisoryLocks>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl LeasingService {
    /// Creates a leasing service over a task repository.
    #[must_use]
    pub fn new(
        tasks: DynTaskRepository,
        locks: Arc<AdvisoryLocks>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            tasks,
            locks,
            clock,
        }
    }

    /// Atomically selects and claims one eligible task for the performer.
    ///
    /// Returns `Ok(None)` when no eligible task exists. Eligibility, in
    /// priority order (ties broken oldest-created-first): leasable state,
    /// no live lease (expired leases count as free), and no failure
    /// recorded by this performer.
    ///
    /// # Errors
    ///
    /// Returns [`LeasingError::Validation`] when the claim-write fails
    /// domain validation and [`LeasingError::Repository`] on persistence
    /// failure.
    pub async fn find_free_task(
        &self,
        performer: &Performer,
    ) -> Result<Option<Task>, LeasingError> {
        let section = self.locks.section(FIND_FREE_TASK_SECTION);
        let _guard = section.lock().await;

        let now = self.clock.utc();
        let Some(mut task) = self.tasks.find_first_free(performer.id(), now).await? else {
            return Ok(None);
        };

        task.occupy(performer.id(), &*self.clock)
            .map_err(validation)?;
        self.tasks.update(&task).await?;

        Ok(Some(task))
    }
}

fn validation(err: DealingDomainError) -> LeasingError {
    LeasingError::Validation(err.to_string())
}
