//! Spend permission types shared by the signing client and the redemption executor.

pub mod facts;
pub mod permission;
pub mod wire;

pub use facts::{AllowanceProvider, AllowanceState, ChainError, ChainReader, ChainWriter, ContractCall};
pub use permission::*;
pub use wire::{RedemptionReceipt, WireError, WirePermission, WireSignedPermission};
