use alloy_primitives::{Address, B256};
use serde_json::{json, Value};
use spend_permission_types::{SpendPermission, DEFAULT_CHAIN_ID, SPEND_PERMISSION_MANAGER};

use crate::encoder::{permission_digest, EncodeError};

pub const DOMAIN_NAME: &str = "Spend Permission Manager";
pub const DOMAIN_VERSION: &str = "1";
pub const PRIMARY_TYPE: &str = "SpendPermission";

/// Field ordering and declared types of the `SpendPermission` struct (v1).
///
/// This is a compatibility contract with the on-chain verifier: client and executor
/// must agree on it.
pub const SPEND_PERMISSION_FIELDS: [(&str, &str); 11] = [
    ("account", "address"),
    ("spender", "address"),
    ("token", "address"),
    ("allowance", "uint160"),
    ("period", "uint48"),
    ("start", "uint48"),
    ("end", "uint48"),
    ("salt", "uint256"),
    ("extraData", "bytes"),
    ("hook", "address"),
    ("hookConfig", "bytes"),
];

/// EIP-712 domain the permission is signed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl PermissionDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract,
        }
    }
}

impl Default for PermissionDomain {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_ID, SPEND_PERMISSION_MANAGER)
    }
}

/// What the wallet is asked to sign: domain, schema, primary type and message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedDataRequest {
    pub domain: PermissionDomain,
    pub primary_type: &'static str,
    pub message: SpendPermission,
}

impl TypedDataRequest {
    pub fn new(domain: PermissionDomain, message: SpendPermission) -> Self {
        Self {
            domain,
            primary_type: PRIMARY_TYPE,
            message,
        }
    }

    pub fn digest(&self) -> Result<B256, EncodeError> {
        permission_digest(&self.message, &self.domain)
    }

    /// Render as an `eth_signTypedData_v4` payload. Integers are decimal strings.
    pub fn to_json(&self) -> Value {
        let fields: Vec<Value> = SPEND_PERMISSION_FIELDS
            .iter()
            .map(|(name, ty)| json!({ "name": name, "type": ty }))
            .collect();
        let m = &self.message;

        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" },
                ],
                "SpendPermission": fields,
            },
            "primaryType": self.primary_type,
            "domain": {
                "name": self.domain.name,
                "version": self.domain.version,
                "chainId": self.domain.chain_id,
                "verifyingContract": self.domain.verifying_contract.to_string(),
            },
            "message": {
                "account": m.account.to_string(),
                "spender": m.spender.to_string(),
                "token": m.token.to_string(),
                "allowance": m.allowance.to_string(),
                "period": m.period.to_string(),
                "start": m.start.to_string(),
                "end": m.end.to_string(),
                "salt": m.salt.to_string(),
                "extraData": m.extra_data.to_string(),
                "hook": m.hook.to_string(),
                "hookConfig": m.hook_config.to_string(),
            },
        })
    }
}
