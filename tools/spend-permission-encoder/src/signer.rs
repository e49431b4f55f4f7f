//! secp256k1 signing and recovery over typed-data digests.

use alloy_primitives::{Address, Bytes, B256};
use k256::{
    ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey,
};
use thiserror::Error;

use crate::encoder::keccak256_bytes;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("expected a 65-byte signature, got {0} bytes")]
    Length(usize),
    #[error("unrecognised recovery byte {0}")]
    RecoveryByte(u8),
    #[error(transparent)]
    Ecdsa(#[from] k256::ecdsa::Error),
}

/// Ethereum address of a public key: low 20 bytes of keccak256(X || Y).
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = PublicKey::from(key).to_encoded_point(false);
    let hash = keccak256_bytes(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Sign `digest` and return `r || s || v` with `v` in {27, 28}.
pub fn sign_digest(digest: B256, signing_key: &SigningKey) -> Result<Bytes, SignatureError> {
    let (signature, recovery_id) = signing_key.sign_prehash_recoverable(digest.as_slice())?;

    let mut sig_bytes = Vec::with_capacity(65);
    sig_bytes.extend_from_slice(&signature.to_bytes());
    sig_bytes.push(27 + recovery_id.to_byte());
    Ok(Bytes::from(sig_bytes))
}

/// Recover the signer of `digest`. Accepts `v` in {0, 1, 27, 28}.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != 65 {
        return Err(SignatureError::Length(signature.len()));
    }
    let v = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        other => return Err(SignatureError::RecoveryByte(other)),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or(SignatureError::RecoveryByte(v))?;
    let signature = Signature::from_slice(&signature[..64])?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)?;
    Ok(address_of(&key))
}
