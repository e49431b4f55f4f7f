//! Off-chain encoding for spend permissions: EIP-712 digest, manager/ERC-20 calldata,
//! hook selection and secp256k1 signing.

pub mod abi;
pub mod encoder;
pub mod hook;
pub mod signer;
pub mod types;

#[cfg(test)]
mod tests;

pub use encoder::{check_widths, domain_separator, permission_digest, struct_hash, EncodeError};
pub use hook::{select_hook, HookAddresses};
pub use signer::{address_of, recover_signer, sign_digest, SignatureError};
pub use types::{PermissionDomain, TypedDataRequest};
