use alloy_primitives::{address, Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel token address denoting the chain's native asset.
pub const NATIVE_TOKEN_ADDRESS: Address = address!("0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

/// USDC (Base mainnet deployment).
pub const USDC_ADDRESS: Address = address!("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913");

/// Spend Permission Manager the executor registers permissions with.
pub const SPEND_PERMISSION_MANAGER: Address =
    address!("0x0de59ad970032a49ca4b88eb33304fc38b4713ea");

/// Base Sepolia.
pub const DEFAULT_CHAIN_ID: u64 = 84_532;

/// One day: the allowance replenishes once per period.
pub const PERIOD_SECONDS: u64 = 86_400;

/// Validity window of a freshly built permission (365 days).
pub const VALIDITY_SECONDS: u64 = 365 * 24 * 60 * 60;

pub const USDC_DECIMALS: u8 = 6;
pub const NATIVE_DECIMALS: u8 = 18;

/// Declared bit width of `allowance` (`uint160`).
pub const ALLOWANCE_BITS: usize = 160;
/// Declared bit width of `period`, `start` and `end` (`uint48`).
pub const TIMESTAMP_BITS: usize = 48;

/// `type(uint48).max`
pub const MAX_UINT48: u64 = (1u64 << TIMESTAMP_BITS) - 1;
/// `type(uint160).max`
pub const MAX_UINT160: U256 = U256::from_limbs([u64::MAX, u64::MAX, u32::MAX as u64, 0]);

/// Token class, as far as the hook policy and approval flow care.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    /// ERC-20 style token.
    Fungible,
    /// The chain's native asset.
    Native,
}

impl TokenKind {
    /// `ETH` selects the native asset; every other symbol is treated as an ERC-20.
    pub fn from_symbol(symbol: &str) -> Self {
        if symbol.trim().eq_ignore_ascii_case("ETH") {
            Self::Native
        } else {
            Self::Fungible
        }
    }

    pub fn from_address(token: Address) -> Self {
        if token == NATIVE_TOKEN_ADDRESS {
            Self::Native
        } else {
            Self::Fungible
        }
    }
}

/// A token the user can grant an allowance over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn usdc() -> Self {
        Self {
            symbol: "USDC".to_string(),
            address: USDC_ADDRESS,
            decimals: USDC_DECIMALS,
        }
    }

    pub fn native() -> Self {
        Self {
            symbol: "ETH".to_string(),
            address: NATIVE_TOKEN_ADDRESS,
            decimals: NATIVE_DECIMALS,
        }
    }

    /// Resolve a form selection. Unknown symbols fall back to USDC.
    pub fn from_symbol(symbol: &str) -> Self {
        match TokenKind::from_symbol(symbol) {
            TokenKind::Native => Self::native(),
            TokenKind::Fungible => Self::usdc(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        TokenKind::from_address(self.address)
    }
}

/// Balance-abstraction mode carried (as a UTF-8 tag) in `extraData`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BalanceAbstraction {
    #[default]
    None,
    MagicSpend,
    Subaccount,
}

impl BalanceAbstraction {
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::MagicSpend => Some("magic-spend"),
            Self::Subaccount => Some("subaccount"),
        }
    }

    /// Packed encoding of the tag (`abi.encodePacked(string)`), empty for `None`.
    pub fn extra_data(&self) -> Bytes {
        match self.tag() {
            Some(tag) => Bytes::copy_from_slice(tag.as_bytes()),
            None => Bytes::new(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" | "none" => Some(Self::None),
            "magic-spend" => Some(Self::MagicSpend),
            "subaccount" => Some(Self::Subaccount),
            _ => None,
        }
    }

    /// Inverse of [`Self::extra_data`]; `None` for foreign `extraData`.
    pub fn from_extra_data(extra_data: &[u8]) -> Option<Self> {
        std::str::from_utf8(extra_data).ok().and_then(Self::parse)
    }
}

/// Reasons a [`SpendPermission`] cannot be signed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("allowance must be greater than zero")]
    ZeroAllowance,
    #[error("validity window is empty: start {start} >= end {end}")]
    EmptyWindow { start: u64, end: u64 },
    #[error("field `{field}` exceeds its declared width of {bits} bits")]
    FieldOverflow { field: &'static str, bits: usize },
}

/// The signable spend permission record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpendPermission {
    /// Owner granting the allowance; must be the signer.
    pub account: Address,
    pub spender: Address,
    pub token: Address,
    /// Per-period cap in the token's smallest unit (`uint160`).
    pub allowance: U256,
    /// Seconds (`uint48`).
    pub period: u64,
    /// Unix seconds (`uint48`).
    pub start: u64,
    /// Unix seconds (`uint48`).
    pub end: u64,
    pub salt: U256,
    pub extra_data: Bytes,
    /// Zero when no auxiliary enforcement applies.
    pub hook: Address,
    pub hook_config: Bytes,
}

impl SpendPermission {
    pub fn token_kind(&self) -> TokenKind {
        TokenKind::from_address(self.token)
    }

    /// Reject zero allowances, empty windows and oversized fields.
    pub fn validate(&self) -> Result<(), PermissionError> {
        if self.allowance.is_zero() {
            return Err(PermissionError::ZeroAllowance);
        }
        if self.start >= self.end {
            return Err(PermissionError::EmptyWindow {
                start: self.start,
                end: self.end,
            });
        }
        self.check_widths()
    }

    /// Integer fields must fit the widths the on-chain verifier declares.
    pub fn check_widths(&self) -> Result<(), PermissionError> {
        if self.allowance > MAX_UINT160 {
            return Err(PermissionError::FieldOverflow {
                field: "allowance",
                bits: ALLOWANCE_BITS,
            });
        }
        for (field, value) in [("period", self.period), ("start", self.start), ("end", self.end)] {
            if value > MAX_UINT48 {
                return Err(PermissionError::FieldOverflow {
                    field,
                    bits: TIMESTAMP_BITS,
                });
            }
        }
        Ok(())
    }
}

/// A permission paired with the owner's signature over its typed-data digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedPermission {
    pub permission: SpendPermission,
    pub signature: Bytes,
}
