//! In-memory allowance provider for tests and dry runs.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use spend_permission_types::{AllowanceProvider, ChainError};

/// Reports a single configurable allowance for every `{owner, spender, token}`.
///
/// `None` behaves like an unreachable node.
#[derive(Debug, Default)]
pub struct MockAllowanceProvider {
    approved: Mutex<Option<U256>>,
    queries: AtomicUsize,
}

impl MockAllowanceProvider {
    pub fn new(approved: U256) -> Self {
        Self {
            approved: Mutex::new(Some(approved)),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Simulate an approval landing on-chain.
    pub fn set(&self, approved: U256) {
        if let Ok(mut slot) = self.approved.lock() {
            *slot = Some(approved);
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AllowanceProvider for MockAllowanceProvider {
    async fn allowance(
        &self,
        _owner: Address,
        _spender: Address,
        _token: Address,
    ) -> Result<U256, ChainError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let approved = self
            .approved
            .lock()
            .map_err(|_| ChainError::Transport("allowance mock poisoned".to_string()))?;
        approved.ok_or_else(|| ChainError::Transport("allowance unavailable".to_string()))
    }
}
