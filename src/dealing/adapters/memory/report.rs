//! In-memory media probe report repository.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::dealing::{
    domain::MediaMetaReport,
    ports::{ReportRepository, ReportRepositoryError, ReportRepositoryResult},
};

/// Thread-safe in-memory report repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReportRepository {
    state: Arc<RwLock<Vec<MediaMetaReport>>>,
}

impl InMemoryReportRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned(err: impl std::fmt::Display) -> ReportRepositoryError {
    ReportRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn store(&self, report: &MediaMetaReport) -> ReportRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.push(report.clone());
        Ok(())
    }

    async fn find_by_path_and_size(
        &self,
        remote_path: &str,
        size: u64,
    ) -> ReportRepositoryResult<Option<MediaMetaReport>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .iter()
            .find(|report| report.remote_path() == remote_path && report.size() == Some(size))
            .cloned())
    }
}
