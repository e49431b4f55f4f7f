//! Signing boundary: the wallet that turns a typed-data request into a signature.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use spend_permission_encoder::{address_of, sign_digest, TypedDataRequest};

use crate::error::SigningError;

#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// Resolve to a signature, or [`SigningError::Rejected`] when the user declines.
    async fn sign_typed_data(&self, request: &TypedDataRequest) -> Result<Bytes, SigningError>;
}

/// Signs with a locally held secp256k1 key (EOA).
pub struct LocalKeySigner {
    key: SigningKey,
    address: Address,
}

impl LocalKeySigner {
    pub fn new(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl TypedDataSigner for LocalKeySigner {
    async fn sign_typed_data(&self, request: &TypedDataRequest) -> Result<Bytes, SigningError> {
        // The owner is the only identity allowed to sign its own permission.
        if request.message.account != self.address {
            return Err(SigningError::Provider(format!(
                "permission account {} is not the signer {}",
                request.message.account, self.address
            )));
        }
        let digest = request
            .digest()
            .map_err(|e| SigningError::Provider(e.to_string()))?;
        sign_digest(digest, &self.key).map_err(|e| SigningError::Provider(e.to_string()))
    }
}
