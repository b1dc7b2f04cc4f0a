//! In-memory file selection repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::dealing::{
    domain::{FileSelection, SelectionId},
    ports::{SelectionRepository, SelectionRepositoryError, SelectionRepositoryResult},
};

/// Thread-safe in-memory selection repository.
#[derive(Debug, Clone, Default)]
pub struct InMemorySelectionRepository {
    state: Arc<RwLock<HashMap<SelectionId, FileSelection>>>,
}

impl InMemorySelectionRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned(err: impl std::fmt::Display) -> SelectionRepositoryError {
    SelectionRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl SelectionRepository for InMemorySelectionRepository {
    async fn store(&self, selection: &FileSelection) -> SelectionRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.insert(selection.id(), selection.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: SelectionId,
    ) -> SelectionRepositoryResult<Option<FileSelection>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.get(&id).cloned())
    }
}
