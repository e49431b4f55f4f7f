//! Solidity ABI for the spend permission manager and ERC-20 tokens.
//!
//! Only the functions the executor and the approval flow call are declared.

use alloy_primitives::{
    aliases::{U160, U48},
    Address, Bytes, U256,
};
use alloy_sol_types::{sol, SolCall};
use spend_permission_types::{
    ChainError, PermissionError, SpendPermission, ALLOWANCE_BITS, MAX_UINT160,
};

use crate::encoder::{check_widths, EncodeError};

sol! {
    interface ISpendPermissionManager {
        struct SpendPermission {
            address account;
            address spender;
            address token;
            uint160 allowance;
            uint48 period;
            uint48 start;
            uint48 end;
            uint256 salt;
            bytes extraData;
            address hook;
            bytes hookConfig;
        }

        function approveWithSignature(SpendPermission calldata spendPermission, bytes calldata signature)
            external
            returns (bool);
        function spend(SpendPermission calldata spendPermission, uint160 value, bytes calldata hookData)
            external;
    }

    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
    }
}

pub const APPROVE_WITH_SIGNATURE: &str = "approveWithSignature";
pub const SPEND: &str = "spend";
pub const ERC20_APPROVE: &str = "approve";

fn u48(value: u64) -> U48 {
    let bytes = value.to_be_bytes();
    // widths are checked before conversion, so the top two bytes are zero.
    U48::try_from_be_slice(&bytes[2..]).unwrap_or(U48::MAX)
}

fn u160(value: U256) -> U160 {
    let bytes = value.to_be_bytes::<32>();
    U160::try_from_be_slice(&bytes[12..]).unwrap_or(U160::MAX)
}

/// Convert to the ABI struct, enforcing the declared widths.
pub fn to_abi(
    permission: &SpendPermission,
) -> Result<ISpendPermissionManager::SpendPermission, EncodeError> {
    check_widths(permission)?;
    Ok(ISpendPermissionManager::SpendPermission {
        account: permission.account,
        spender: permission.spender,
        token: permission.token,
        allowance: u160(permission.allowance),
        period: u48(permission.period),
        start: u48(permission.start),
        end: u48(permission.end),
        salt: permission.salt,
        extraData: permission.extra_data.clone(),
        hook: permission.hook,
        hookConfig: permission.hook_config.clone(),
    })
}

pub fn approve_with_signature_calldata(
    permission: &SpendPermission,
    signature: &Bytes,
) -> Result<Bytes, EncodeError> {
    let call = ISpendPermissionManager::approveWithSignatureCall {
        spendPermission: to_abi(permission)?,
        signature: signature.clone(),
    };
    Ok(Bytes::from(call.abi_encode()))
}

pub fn spend_calldata(
    permission: &SpendPermission,
    value: U256,
    hook_data: &Bytes,
) -> Result<Bytes, EncodeError> {
    if value > MAX_UINT160 {
        return Err(PermissionError::FieldOverflow {
            field: "value",
            bits: ALLOWANCE_BITS,
        }
        .into());
    }
    let call = ISpendPermissionManager::spendCall {
        spendPermission: to_abi(permission)?,
        value: u160(value),
        hookData: hook_data.clone(),
    };
    Ok(Bytes::from(call.abi_encode()))
}

pub fn erc20_allowance_calldata(owner: Address, spender: Address) -> Bytes {
    Bytes::from(IERC20::allowanceCall { owner, spender }.abi_encode())
}

/// Maximum-quantity approval.
pub fn erc20_approve_max_calldata(spender: Address) -> Bytes {
    Bytes::from(
        IERC20::approveCall {
            spender,
            value: U256::MAX,
        }
        .abi_encode(),
    )
}

pub fn decode_allowance(data: &[u8]) -> Result<U256, ChainError> {
    IERC20::allowanceCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| ChainError::MalformedReturn(e.to_string()))
}
