//! In-memory order repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::dealing::{
    domain::{Order, OrderId},
    ports::{OrderRepository, OrderRepositoryError, OrderRepositoryResult},
};

/// Thread-safe in-memory order repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned(err: impl std::fmt::Display) -> OrderRepositoryError {
    OrderRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn store(&self, order: &Order) -> OrderRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.contains_key(&order.id()) {
            return Err(OrderRepositoryError::DuplicateOrder(order.id()));
        }
        state.insert(order.id(), order.clone());
        Ok(())
    }

    async fn update(&self, order: &Order) -> OrderRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if !state.contains_key(&order.id()) {
            return Err(OrderRepositoryError::NotFound(order.id()));
        }
        state.insert(order.id(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> OrderRepositoryResult<Option<Order>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.get(&id).cloned())
    }
}
