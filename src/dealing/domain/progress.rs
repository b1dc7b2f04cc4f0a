//! Validated progress scalar.

use super::DealingDomainError;
use serde::{Deserialize, Serialize};

/// Completion ratio of a task, always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Progress(f64);

impl Progress {
    /// Zero progress.
    pub const ZERO: Self = Self(0.0);

    /// Creates a validated progress value.
    ///
    /// # Errors
    ///
    /// Returns [`DealingDomainError::ProgressOutOfRange`] when the value is
    /// not a finite number within `[0, 1]`.
    pub fn new(value: f64) -> Result<Self, DealingDomainError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(DealingDomainError::ProgressOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying ratio.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<f64> for Progress {
    type Error = DealingDomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Progress> for f64 {
    fn from(progress: Progress) -> Self {
        progress.value()
    }
}
