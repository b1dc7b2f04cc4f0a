//! Order aggregate root: a batch request expanding into tasks.

use super::{DealingDomainError, OrderId, ParseOrderStateError, SelectionId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Order lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Order exists; its tasks are not yet offered to performers.
    Created,
    /// Order and its tasks are in the free pool.
    Published,
    /// Order was withdrawn along with all its tasks.
    Cancelled,
}

impl OrderState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether the state permits transitioning to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Published | Self::Cancelled)
                | (Self::Published, Self::Cancelled)
        )
    }
}

impl TryFrom<&str> for OrderState {
    type Error = ParseOrderStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "created" => Ok(Self::Created),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseOrderStateError(value.to_owned())),
        }
    }
}

/// Template parameters of a convert order.
///
/// The option strings are percent-style templates (`%{input_path}`,
/// `%{output_path}`, `%{basename}`) instantiated per source file during
/// expansion; the muxers double as output file extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOrderPayload {
    /// Output container for video sources.
    pub video_muxer: String,
    /// Option template applied to video sources.
    pub video_opts: String,
    /// Output container for audio sources.
    pub audio_muxer: String,
    /// Option template applied to audio sources.
    pub audio_opts: String,
    /// Remote directory the expanded tasks upload under.
    pub output_remote_path: String,
}

/// Variant-specific order parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderPayload {
    /// Batch-convert a file selection.
    Convert(ConvertOrderPayload),
}

impl OrderPayload {
    /// Returns the canonical kind tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Convert(_) => "convert",
        }
    }
}

/// Order aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    payload: OrderPayload,
    state: OrderState,
    file_selection_id: Option<SelectionId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted order aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedOrderData {
    /// Persisted order identifier.
    pub id: OrderId,
    /// Persisted variant parameters.
    pub payload: OrderPayload,
    /// Persisted lifecycle state.
    pub state: OrderState,
    /// Persisted source selection, if any.
    pub file_selection_id: Option<SelectionId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in `created` state.
    #[must_use]
    pub fn new(
        payload: OrderPayload,
        file_selection_id: Option<SelectionId>,
        clock: &(impl Clock + ?Sized),
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: OrderId::new(),
            payload,
            state: OrderState::Created,
            file_selection_id,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs an order from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedOrderData) -> Self {
        Self {
            id: data.id,
            payload: data.payload,
            state: data.state,
            file_selection_id: data.file_selection_id,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the order identifier.
    #[must_use]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the variant parameters.
    #[must_use]
    pub const fn payload(&self) -> &OrderPayload {
        &self.payload
    }

    /// Returns the order lifecycle state.
    #[must_use]
    pub const fn state(&self) -> OrderState {
        self.state
    }

    /// Returns the source selection, if any.
    #[must_use]
    pub const fn file_selection_id(&self) -> Option<SelectionId> {
        self.file_selection_id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Publishes the order. Owned tasks cascade in the lifecycle service.
    ///
    /// # Errors
    ///
    /// Returns [`DealingDomainError::InvalidOrderStateTransition`] when the
    /// order is not in `created` state.
    pub fn publish(&mut self, clock: &(impl Clock + ?Sized)) -> Result<(), DealingDomainError> {
        self.transition_to(OrderState::Published, clock)
    }

    /// Cancels the order. Owned tasks cascade in the lifecycle service.
    ///
    /// # Errors
    ///
    /// Returns [`DealingDomainError::InvalidOrderStateTransition`] when the
    /// order is already cancelled.
    pub fn cancel(&mut self, clock: &(impl Clock + ?Sized)) -> Result<(), DealingDomainError> {
        self.transition_to(OrderState::Cancelled, clock)
    }

    fn transition_to(
        &mut self,
        target: OrderState,
        clock: &(impl Clock + ?Sized),
    ) -> Result<(), DealingDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(DealingDomainError::InvalidOrderStateTransition {
                order_id: self.id,
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        self.updated_at = clock.utc();
        Ok(())
    }
}
