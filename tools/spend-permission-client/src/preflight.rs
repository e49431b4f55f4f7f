//! Allowance preflight: does the owner still need to approve the permission manager?

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use spend_permission_encoder::abi::{decode_allowance, erc20_allowance_calldata};
use spend_permission_types::{
    AllowanceProvider, ChainError, ChainReader, SpendPermission, TokenKind,
};

/// An approval is needed when the allowance is unknown or below what the permission grants.
pub fn needs_approval(current: Option<U256>, intended: U256) -> bool {
    match current {
        None => true,
        Some(current) => current.is_zero() || current < intended,
    }
}

/// Approvals only gate ERC-20 permissions on networks without auxiliary funds.
pub fn approval_applies(permission: &SpendPermission, auxiliary_funds: bool) -> bool {
    permission.token_kind() == TokenKind::Fungible && !auxiliary_funds
}

/// Reads `IERC20.allowance(owner, spender)` through a [`ChainReader`].
pub struct Erc20AllowanceReader<R> {
    reader: R,
}

impl<R> Erc20AllowanceReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R: ChainReader> AllowanceProvider for Erc20AllowanceReader<R> {
    async fn allowance(
        &self,
        owner: Address,
        spender: Address,
        token: Address,
    ) -> Result<U256, ChainError> {
        let data = self
            .reader
            .call(token, erc20_allowance_calldata(owner, spender))
            .await?;
        decode_allowance(&data)
    }
}

/// Preflight against the manager that will pull the tokens.
pub struct Preflight<'a> {
    pub provider: &'a dyn AllowanceProvider,
    pub manager: Address,
}

impl Preflight<'_> {
    pub async fn check(&self, permission: &SpendPermission) -> bool {
        let state = self
            .provider
            .snapshot(permission.account, self.manager, permission.token)
            .await;
        if let Err(error) = &state.approved {
            tracing::debug!(token = %permission.token, %error, "allowance unavailable");
        }
        needs_approval(state.known(), permission.allowance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use std::sync::Mutex;

    use crate::facts::MockAllowanceProvider;

    #[test]
    fn decision_table() {
        let intended = U256::from(10u64);
        assert!(needs_approval(None, intended));
        assert!(needs_approval(Some(U256::ZERO), intended));
        assert!(needs_approval(Some(U256::from(9u64)), intended));
        assert!(!needs_approval(Some(U256::from(10u64)), intended));
        assert!(!needs_approval(Some(U256::MAX), intended));
    }

    struct FixedReader {
        calls: Mutex<Vec<(Address, Bytes)>>,
        word: [u8; 32],
    }

    #[async_trait]
    impl ChainReader for FixedReader {
        async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
            self.calls.lock().unwrap().push((to, data));
            Ok(Bytes::copy_from_slice(&self.word))
        }
    }

    #[tokio::test]
    async fn erc20_reader_queries_token_contract() {
        let reader = FixedReader {
            calls: Mutex::new(Vec::new()),
            word: U256::from(42u64).to_be_bytes::<32>(),
        };
        let owner = Address::repeat_byte(1);
        let manager = Address::repeat_byte(2);
        let token = Address::repeat_byte(3);
        let provider = Erc20AllowanceReader::new(reader);

        let first = provider.allowance(owner, manager, token).await.unwrap();
        let second = provider.allowance(owner, manager, token).await.unwrap();
        assert_eq!(first, U256::from(42u64));
        assert_eq!(first, second);

        let calls = provider.reader.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, token);
        assert_eq!(calls[0].1, erc20_allowance_calldata(owner, manager));
    }

    #[tokio::test]
    async fn unavailable_allowance_requires_approval() {
        let provider = MockAllowanceProvider::unavailable();
        let preflight = Preflight {
            provider: &provider,
            manager: Address::repeat_byte(2),
        };
        let permission = SpendPermission {
            account: Address::repeat_byte(1),
            spender: Address::repeat_byte(4),
            token: Address::repeat_byte(3),
            allowance: U256::from(1u64),
            period: 1,
            start: 1,
            end: 2,
            salt: U256::ZERO,
            extra_data: Bytes::new(),
            hook: Address::ZERO,
            hook_config: Bytes::new(),
        };
        assert!(preflight.check(&permission).await);

        let state = provider
            .snapshot(permission.account, preflight.manager, permission.token)
            .await;
        assert_eq!(
            state.approved,
            Err(ChainError::Transport("allowance unavailable".to_string()))
        );
        assert_eq!(state.known(), None);

        provider.set(U256::from(1u64));
        assert!(!preflight.check(&permission).await);
    }
}
