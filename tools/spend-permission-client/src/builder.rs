//! Permission construction from the authorization form.

use alloy_primitives::{Address, Bytes, U256};
use rand::RngCore;
use spend_permission_encoder::{select_hook, HookAddresses};
use spend_permission_types::{
    BalanceAbstraction, SpendPermission, Token, TokenKind, PERIOD_SECONDS, VALIDITY_SECONDS,
};
use time::OffsetDateTime;

use crate::{amount::parse_units, error::BuildError};

/// Wallet capabilities advertised for the active network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetworkCapabilities {
    /// Balance abstraction ("auxiliary funds") is supported.
    pub auxiliary_funds: bool,
}

/// What the user entered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationForm {
    /// Connected account; `None` until a wallet is connected.
    pub account: Option<Address>,
    pub amount: String,
    pub token: Token,
    pub balance_abstraction: BalanceAbstraction,
}

impl AuthorizationForm {
    pub fn new(account: Option<Address>, amount: impl Into<String>, token: Token) -> Self {
        Self {
            account,
            amount: amount.into(),
            token,
            balance_abstraction: BalanceAbstraction::None,
        }
    }

    pub fn with_balance_abstraction(mut self, mode: BalanceAbstraction) -> Self {
        self.balance_abstraction = mode;
        self
    }

    /// Drop selections the network cannot honour: without auxiliary funds the native
    /// asset falls back to USDC and balance abstraction falls back to none.
    pub fn normalize(mut self, capabilities: NetworkCapabilities) -> Self {
        if !capabilities.auxiliary_funds {
            if self.token.kind() == TokenKind::Native {
                self.token = Token::usdc();
            }
            self.balance_abstraction = BalanceAbstraction::None;
        }
        self
    }
}

/// Builds permissions for a fixed spender on one network.
#[derive(Clone, Debug)]
pub struct PermissionBuilder {
    pub spender: Address,
    pub hooks: HookAddresses,
    pub capabilities: NetworkCapabilities,
}

impl PermissionBuilder {
    pub fn new(spender: Address, hooks: HookAddresses, capabilities: NetworkCapabilities) -> Self {
        Self {
            spender,
            hooks,
            capabilities,
        }
    }

    /// Build with an explicit clock and salt.
    pub fn build(
        &self,
        form: &AuthorizationForm,
        now: u64,
        salt: U256,
    ) -> Result<SpendPermission, BuildError> {
        let account = form.account.ok_or(BuildError::MissingFields)?;
        if form.amount.trim().is_empty() {
            return Err(BuildError::MissingFields);
        }

        let allowance = parse_units(&form.amount, form.token.decimals)?;
        let hook = select_hook(
            form.token.kind(),
            self.capabilities.auxiliary_funds,
            &self.hooks,
        );

        let permission = SpendPermission {
            account,
            spender: self.spender,
            token: form.token.address,
            allowance,
            period: PERIOD_SECONDS,
            start: now,
            end: now.saturating_add(VALIDITY_SECONDS),
            salt,
            extra_data: form.balance_abstraction.extra_data(),
            hook,
            hook_config: Bytes::new(),
        };
        permission.validate()?;
        Ok(permission)
    }

    /// Build starting now, with a fresh random salt.
    pub fn build_now(&self, form: &AuthorizationForm) -> Result<SpendPermission, BuildError> {
        self.build(form, unix_now(), random_salt())
    }
}

pub fn unix_now() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or_default()
}

/// 256 random bits.
pub fn random_salt() -> U256 {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    U256::from_be_bytes(bytes)
}
