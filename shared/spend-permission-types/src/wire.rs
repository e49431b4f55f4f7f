//! JSON wire form of a permission.
//!
//! Integer fields travel as decimal strings so that 160/256-bit values survive
//! JavaScript-side JSON handling; [`WirePermission::into_permission`] reverses that.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::permission::{
    SignedPermission, SpendPermission, ALLOWANCE_BITS, MAX_UINT160, MAX_UINT48, TIMESTAMP_BITS,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("field `{field}` is not a decimal integer: {value:?}")]
    NotDecimal { field: &'static str, value: String },
    #[error("field `{field}` exceeds {bits} bits")]
    Overflow { field: &'static str, bits: usize },
    #[error("signature is not valid hex: {0}")]
    Signature(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePermission {
    pub account: Address,
    pub spender: Address,
    pub token: Address,
    #[serde(deserialize_with = "decimal_string")]
    pub allowance: String,
    #[serde(deserialize_with = "decimal_string")]
    pub period: String,
    #[serde(deserialize_with = "decimal_string")]
    pub start: String,
    #[serde(deserialize_with = "decimal_string")]
    pub end: String,
    #[serde(deserialize_with = "decimal_string")]
    pub salt: String,
    #[serde(default)]
    pub extra_data: Bytes,
    #[serde(default)]
    pub hook: Address,
    #[serde(default)]
    pub hook_config: Bytes,
}

impl WirePermission {
    pub fn from_permission(permission: &SpendPermission) -> Self {
        Self {
            account: permission.account,
            spender: permission.spender,
            token: permission.token,
            allowance: permission.allowance.to_string(),
            period: permission.period.to_string(),
            start: permission.start.to_string(),
            end: permission.end.to_string(),
            salt: permission.salt.to_string(),
            extra_data: permission.extra_data.clone(),
            hook: permission.hook,
            hook_config: permission.hook_config.clone(),
        }
    }

    /// Rebuild the native record, checking every integer against its declared width.
    pub fn into_permission(self) -> Result<SpendPermission, WireError> {
        Ok(SpendPermission {
            account: self.account,
            spender: self.spender,
            token: self.token,
            allowance: parse_decimal_u256("allowance", &self.allowance, Some(MAX_UINT160))?,
            period: parse_decimal_u48("period", &self.period)?,
            start: parse_decimal_u48("start", &self.start)?,
            end: parse_decimal_u48("end", &self.end)?,
            salt: parse_decimal_u256("salt", &self.salt, None)?,
            extra_data: self.extra_data,
            hook: self.hook,
            hook_config: self.hook_config,
        })
    }
}

/// Body of a redemption request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSignedPermission {
    pub permission: WirePermission,
    pub signature: Bytes,
}

impl From<&SignedPermission> for WireSignedPermission {
    fn from(signed: &SignedPermission) -> Self {
        Self {
            permission: WirePermission::from_permission(&signed.permission),
            signature: signed.signature.clone(),
        }
    }
}

/// Transaction hashes reported by a successful redemption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionReceipt {
    pub approve_tx_hash: B256,
    pub spend_tx_hash: B256,
}

/// Decode a `0x`-prefixed (or bare) hex signature.
pub fn parse_signature(value: &str) -> Result<Bytes, WireError> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(WireError::Signature(value.to_string()));
    }
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| WireError::Signature(format!("{value}: {e}")))
}

pub fn parse_decimal_u256(
    field: &'static str,
    value: &str,
    max: Option<U256>,
) -> Result<U256, WireError> {
    let digits = value.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WireError::NotDecimal {
            field,
            value: value.to_string(),
        });
    }
    let bits = if max.is_some() { ALLOWANCE_BITS } else { 256 };
    let parsed =
        U256::from_str_radix(digits, 10).map_err(|_| WireError::Overflow { field, bits })?;
    match max {
        Some(max) if parsed > max => Err(WireError::Overflow { field, bits }),
        _ => Ok(parsed),
    }
}

pub fn parse_decimal_u48(field: &'static str, value: &str) -> Result<u64, WireError> {
    let digits = value.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WireError::NotDecimal {
            field,
            value: value.to_string(),
        });
    }
    let overflow = WireError::Overflow {
        field,
        bits: TIMESTAMP_BITS,
    };
    let parsed: u64 = digits.parse().map_err(|_| overflow.clone())?;
    if parsed > MAX_UINT48 {
        return Err(overflow);
    }
    Ok(parsed)
}

/// Accept `"123"` or `123` for an integer field.
fn decimal_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(s) => s,
        Repr::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{NATIVE_TOKEN_ADDRESS, USDC_ADDRESS};

    fn permission(allowance: U256, time: u64, salt: U256) -> SpendPermission {
        SpendPermission {
            account: Address::repeat_byte(0x11),
            spender: Address::repeat_byte(0x22),
            token: USDC_ADDRESS,
            allowance,
            period: time,
            start: time,
            end: time,
            salt,
            extra_data: Bytes::new(),
            hook: Address::ZERO,
            hook_config: Bytes::new(),
        }
    }

    #[test]
    fn integer_fields_survive_decimal_strings_at_boundaries() {
        let cases = [
            (U256::ZERO, 0u64, U256::ZERO),
            (U256::from(1u64), 1, U256::from(1u64)),
            (MAX_UINT160, MAX_UINT48, U256::MAX),
        ];
        for (allowance, time, salt) in cases {
            let original = permission(allowance, time, salt);
            let wire = WirePermission::from_permission(&original);
            let json = serde_json::to_string(&wire).unwrap();
            let decoded: WirePermission = serde_json::from_str(&json).unwrap();
            assert_eq!(decoded.into_permission().unwrap(), original);
        }
    }

    #[test]
    fn max_values_render_as_expected_decimals() {
        let wire = WirePermission::from_permission(&permission(MAX_UINT160, MAX_UINT48, U256::MAX));
        assert_eq!(wire.allowance, "1461501637330902918203684832716283019655932542975");
        assert_eq!(wire.period, "281474976710655");
        assert_eq!(
            wire.salt,
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }

    #[test]
    fn overflowing_fields_are_rejected() {
        let mut wire = WirePermission::from_permission(&permission(U256::from(1u64), 1, U256::ZERO));
        wire.allowance = "1461501637330902918203684832716283019655932542976".to_string();
        assert_eq!(
            wire.clone().into_permission(),
            Err(WireError::Overflow {
                field: "allowance",
                bits: 160
            })
        );

        wire.allowance = "1".to_string();
        wire.end = "281474976710656".to_string();
        assert_eq!(
            wire.into_permission(),
            Err(WireError::Overflow {
                field: "end",
                bits: 48
            })
        );
    }

    #[test]
    fn non_decimal_fields_are_rejected() {
        for bad in ["", "-1", "1.5", "0x10", "abc"] {
            assert!(matches!(
                parse_decimal_u48("start", bad),
                Err(WireError::NotDecimal { .. })
            ));
        }
    }

    #[test]
    fn numbers_are_accepted_for_integer_fields() {
        let json = format!(
            r#"{{
                "account": "0x1111111111111111111111111111111111111111",
                "spender": "0x2222222222222222222222222222222222222222",
                "token": "{NATIVE_TOKEN_ADDRESS}",
                "allowance": "1000000000000000000",
                "period": 86400,
                "start": 1700000000,
                "end": "1731536000",
                "salt": "42",
                "extraData": "0x",
                "hookConfig": "0x"
            }}"#
        );
        let wire: WirePermission = serde_json::from_str(&json).unwrap();
        let permission = wire.into_permission().unwrap();
        assert_eq!(permission.period, 86_400);
        assert_eq!(permission.start, 1_700_000_000);
        assert_eq!(permission.hook, Address::ZERO);
        assert_eq!(permission.token, NATIVE_TOKEN_ADDRESS);
    }

    #[test]
    fn signature_hex_is_decoded() {
        assert_eq!(parse_signature("0xdeadBEEF").unwrap().as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
        assert!(parse_signature("0x").is_err());
        assert!(parse_signature("0xabc").is_err());
        assert!(parse_signature("zz").is_err());
    }
}
