use alloy_primitives::{Address, FixedBytes, B256, U256};
use sha3::{Digest, Keccak256};
use spend_permission_types::{PermissionError, SpendPermission};
use thiserror::Error;

use crate::types::{PermissionDomain, PRIMARY_TYPE, SPEND_PERMISSION_FIELDS};

pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Canonical encoding of `SPEND_PERMISSION_FIELDS`.
pub const SPEND_PERMISSION_TYPE: &str = "SpendPermission(address account,address spender,address token,uint160 allowance,uint48 period,uint48 start,uint48 end,uint256 salt,bytes extraData,address hook,bytes hookConfig)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Width(#[from] PermissionError),
}

pub(crate) fn keccak256_bytes(bytes: &[u8]) -> FixedBytes<32> {
    let mut h = Keccak256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut b = [0u8; 32];
    b.copy_from_slice(out.as_slice());
    FixedBytes(b)
}

/// Build the type string from the field table (must equal `SPEND_PERMISSION_TYPE`).
pub fn encode_type() -> String {
    let fields: Vec<String> = SPEND_PERMISSION_FIELDS
        .iter()
        .map(|(name, ty)| format!("{ty} {name}"))
        .collect();
    format!("{PRIMARY_TYPE}({})", fields.join(","))
}

pub fn type_hash() -> B256 {
    keccak256_bytes(SPEND_PERMISSION_TYPE.as_bytes())
}

fn address_word(address: Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(address.as_slice());
    padded
}

fn u64_word(value: u64) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[24..32].copy_from_slice(&value.to_be_bytes());
    padded
}

/// Reject integers that do not fit the widths declared in the type string.
pub fn check_widths(permission: &SpendPermission) -> Result<(), EncodeError> {
    permission.check_widths().map_err(EncodeError::from)
}

pub fn domain_separator(domain: &PermissionDomain) -> B256 {
    let mut domain_buf = Vec::with_capacity(32 * 5);
    domain_buf.extend_from_slice(keccak256_bytes(DOMAIN_TYPE.as_bytes()).as_slice());
    domain_buf.extend_from_slice(keccak256_bytes(domain.name.as_bytes()).as_slice());
    domain_buf.extend_from_slice(keccak256_bytes(domain.version.as_bytes()).as_slice());
    domain_buf.extend_from_slice(&U256::from(domain.chain_id).to_be_bytes::<32>());
    domain_buf.extend_from_slice(&address_word(domain.verifying_contract));
    keccak256_bytes(&domain_buf)
}

/// `hashStruct(SpendPermission)`; dynamic `bytes` fields are hashed in place.
pub fn struct_hash(permission: &SpendPermission) -> Result<B256, EncodeError> {
    check_widths(permission)?;

    let mut struct_buf = Vec::with_capacity(32 * (SPEND_PERMISSION_FIELDS.len() + 1));
    struct_buf.extend_from_slice(type_hash().as_slice());
    struct_buf.extend_from_slice(&address_word(permission.account));
    struct_buf.extend_from_slice(&address_word(permission.spender));
    struct_buf.extend_from_slice(&address_word(permission.token));
    struct_buf.extend_from_slice(&permission.allowance.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&u64_word(permission.period));
    struct_buf.extend_from_slice(&u64_word(permission.start));
    struct_buf.extend_from_slice(&u64_word(permission.end));
    struct_buf.extend_from_slice(&permission.salt.to_be_bytes::<32>());
    struct_buf.extend_from_slice(keccak256_bytes(&permission.extra_data).as_slice());
    struct_buf.extend_from_slice(&address_word(permission.hook));
    struct_buf.extend_from_slice(keccak256_bytes(&permission.hook_config).as_slice());
    Ok(keccak256_bytes(&struct_buf))
}

/// Compute the EIP-712 digest the owner signs (must match the manager's `getHash`).
pub fn permission_digest(
    permission: &SpendPermission,
    domain: &PermissionDomain,
) -> Result<B256, EncodeError> {
    let struct_hash = struct_hash(permission)?;
    let domain_separator = domain_separator(domain);

    // keccak256("\x19\x01" || domainSeparator || structHash)
    let mut final_buf = Vec::with_capacity(2 + 32 + 32);
    final_buf.extend_from_slice(b"\x19\x01");
    final_buf.extend_from_slice(domain_separator.as_slice());
    final_buf.extend_from_slice(struct_hash.as_slice());
    Ok(keccak256_bytes(&final_buf))
}
