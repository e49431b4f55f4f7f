//! Chain boundary seams, implemented by the executor over JSON-RPC and by test doubles.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by chain access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The node refused the transaction or the call (RPC error, revert on estimate, ...).
    #[error("transaction rejected: {0}")]
    Rejected(String),
    /// The transaction was mined but reverted.
    #[error("transaction {0} reverted")]
    Reverted(B256),
    /// A transaction that was submitted never produced a receipt.
    #[error("transaction {0} dropped before confirmation")]
    Dropped(B256),
    /// Return data was malformed or could not be decoded.
    #[error("malformed return data: {0}")]
    MalformedReturn(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// A contract call to submit: the function name is kept for logging and test assertions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub function: &'static str,
    pub data: Bytes,
}

/// Read-only access (`eth_call`).
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;
}

/// Transaction submission from the configured signing identity.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    /// Broadcast the call and return its transaction hash once the node accepted it.
    async fn submit(&self, call: ContractCall) -> Result<B256, ChainError>;

    /// Wait until `tx_hash` has `confirmations` confirmations; errors if it reverted.
    async fn wait_for_confirmation(
        &self,
        tx_hash: B256,
        confirmations: usize,
    ) -> Result<(), ChainError>;
}

/// Snapshot of `{owner, spender, token} → approved quantity`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowanceState {
    pub owner: Address,
    pub spender: Address,
    pub token: Address,
    /// The query error when the allowance could not be determined.
    pub approved: Result<U256, ChainError>,
}

impl AllowanceState {
    pub fn known(&self) -> Option<U256> {
        self.approved.as_ref().ok().copied()
    }
}

/// Source of current token approvals; never mutates chain state.
#[async_trait]
pub trait AllowanceProvider: Send + Sync {
    async fn allowance(
        &self,
        owner: Address,
        spender: Address,
        token: Address,
    ) -> Result<U256, ChainError>;

    /// Query without failing; an error leaves the snapshot "unavailable".
    async fn snapshot(&self, owner: Address, spender: Address, token: Address) -> AllowanceState {
        AllowanceState {
            owner,
            spender,
            token,
            approved: self.allowance(owner, spender, token).await,
        }
    }
}
