//! Authorization payload hashing
//!
//! The account contract verifies
//! `keccak256(ETHEREUM_MESSAGE_PREFIX || keccak256(sha256(preimage)))`,
//! so every stage here has to match that chain exactly.

use alloy::primitives::{eip191_hash_message, keccak256, Address, B256};
use alloy::signers::Signature;
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    Hash, HashIdPreimage, HashIdPreimageSorobanAuthorization, Limits, SorobanAuthorizedInvocation,
    WriteXdr,
};

use super::BridgeError;
use crate::account::SECP256K1_SIGNATURE_LEN;

pub const ETHEREUM_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Network id: SHA-256 of the passphrase
pub fn network_id(passphrase: &str) -> Hash {
    Hash(Sha256::digest(passphrase.as_bytes()).into())
}

pub fn authorization_preimage(
    network_id: &Hash,
    nonce: i64,
    signature_expiration_ledger: u32,
    invocation: &SorobanAuthorizedInvocation,
) -> HashIdPreimage {
    HashIdPreimage::SorobanAuthorization(HashIdPreimageSorobanAuthorization {
        network_id: network_id.clone(),
        nonce,
        signature_expiration_ledger,
        invocation: invocation.clone(),
    })
}

/// First stage: SHA-256 of the preimage XDR (what the host passes to `__check_auth`)
pub fn signature_payload(preimage: &HashIdPreimage) -> Result<[u8; 32], BridgeError> {
    let xdr = preimage.to_xdr(Limits::none())?;
    Ok(Sha256::digest(&xdr).into())
}

/// The hashes derived from one signature payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationDigest {
    /// sha256(preimage)
    pub payload: [u8; 32],
    /// keccak256(payload)
    pub message: B256,
    /// keccak256(prefix || message); the value the external key signs
    pub digest: B256,
}

impl AuthorizationDigest {
    pub fn from_payload(payload: [u8; 32]) -> Self {
        let message = keccak256(payload);
        let digest = eip191_hash_message(message);
        Self {
            payload,
            message,
            digest,
        }
    }

    pub fn from_preimage(preimage: &HashIdPreimage) -> Result<Self, BridgeError> {
        Ok(Self::from_payload(signature_payload(preimage)?))
    }
}

/// Map an Ethereum `v` byte (27/28) to a recovery id (0/1)
pub fn normalize_recovery_id(v: u8) -> Result<u8, BridgeError> {
    match v {
        27 | 28 => Ok(v - 27),
        other => Err(BridgeError::InvalidRecoveryId(other)),
    }
}

/// Recover the Ethereum address behind a 65-byte `r || s || v` signature
pub fn recover_signer(digest: &B256, signature: &[u8]) -> Result<Address, BridgeError> {
    if signature.len() != SECP256K1_SIGNATURE_LEN {
        return Err(BridgeError::Recovery(format!(
            "signature must be {} bytes, got {}",
            SECP256K1_SIGNATURE_LEN,
            signature.len()
        )));
    }
    normalize_recovery_id(signature[64])?;
    let signature =
        Signature::from_raw(signature).map_err(|e| BridgeError::Recovery(e.to_string()))?;
    signature
        .recover_address_from_prehash(digest)
        .map_err(|e| BridgeError::Recovery(e.to_string()))
}

/// Ethereum address of a 65-byte uncompressed public key
pub fn address_of_public_key(public_key: &[u8; 65]) -> Address {
    Address::from_slice(&keccak256(&public_key[1..])[12..])
}
