//! In-memory performer repository with unique-name enforcement.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::dealing::{
    domain::{Performer, PerformerId},
    ports::{PerformerRepository, PerformerRepositoryError, PerformerRepositoryResult},
};

/// Thread-safe in-memory performer repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPerformerRepository {
    state: Arc<RwLock<InMemoryPerformerState>>,
}

#[derive(Debug, Default)]
struct InMemoryPerformerState {
    performers: HashMap<PerformerId, Performer>,
    name_index: HashMap<String, PerformerId>,
}

impl InMemoryPerformerRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned(err: impl std::fmt::Display) -> PerformerRepositoryError {
    PerformerRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl PerformerRepository for InMemoryPerformerRepository {
    async fn store(&self, performer: &Performer) -> PerformerRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let name = performer.name().as_str().to_owned();
        if state.name_index.contains_key(&name) {
            return Err(PerformerRepositoryError::DuplicateName(name));
        }
        state.name_index.insert(name, performer.id());
        state.performers.insert(performer.id(), performer.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PerformerId) -> PerformerRepositoryResult<Option<Performer>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.performers.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> PerformerRepositoryResult<Option<Performer>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .name_index
            .get(name)
            .and_then(|id| state.performers.get(id))
            .cloned())
    }
}
