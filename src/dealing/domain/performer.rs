//! Performer identity: a remote worker process known by name.

use super::{DealingDomainError, PerformerId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated, non-empty performer name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformerName(String);

impl PerformerName {
    /// Creates a validated performer name.
    ///
    /// # Errors
    ///
    /// Returns [`DealingDomainError::EmptyPerformerName`] when the value is
    /// empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, DealingDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DealingDomainError::EmptyPerformerName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PerformerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PerformerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A remote worker process, created on first authenticated sight and
/// immutable afterwards except by administrative action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performer {
    id: PerformerId,
    name: PerformerName,
    token: Option<String>,
    created_at: DateTime<Utc>,
}

impl Performer {
    /// Creates a new performer for an authenticated worker name.
    #[must_use]
    pub fn new(name: PerformerName, clock: &(impl Clock + ?Sized)) -> Self {
        Self {
            id: PerformerId::new(),
            name,
            token: None,
            created_at: clock.utc(),
        }
    }

    /// Returns the performer identifier.
    #[must_use]
    pub const fn id(&self) -> PerformerId {
        self.id
    }

    /// Returns the performer name.
    #[must_use]
    pub const fn name(&self) -> &PerformerName {
        &self.name
    }

    /// Returns the administratively assigned token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
