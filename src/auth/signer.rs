//! External signer capability
//!
//! SECURITY: the local signer is the only place a secp256k1 private key lives.
//! - Keys stay inside alloy's `PrivateKeySigner`
//! - Keys are never serialized or logged

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use thiserror::Error;

use crate::account::{VariantKind, SECP256K1_KEY_LEN};

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Environment variable {0} not set. Required for signer initialization.")]
    MissingKey(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Signer declined the request: {0}")]
    Rejected(String),

    #[error("A secp256k1 key cannot identify itself as {0}")]
    UnsupportedIdentity(VariantKind),
}

/// What an external signer hands back for one digest
#[derive(Clone, PartialEq, Eq)]
pub struct ExternalSignature {
    /// Public key or address, matching the account's signer variant
    pub identity: Vec<u8>,
    pub signature: Vec<u8>,
}

impl std::fmt::Debug for ExternalSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalSignature")
            .field("identity", &alloy::hex::encode_prefixed(&self.identity))
            .field("signature", &alloy::hex::encode_prefixed(&self.signature))
            .finish()
    }
}

/// A key on another chain that can sign a 32-byte digest
///
/// Implementations may wait on a wallet or a remote service; callers bound
/// the wait with a timeout.
#[async_trait]
pub trait ExternalSigner: Send + Sync {
    async fn sign(&self, digest: B256) -> Result<ExternalSignature, SignerError>;
}

/// In-process Ethereum key
pub struct LocalEthereumSigner {
    /// The key; only reachable through signing
    signer: PrivateKeySigner,
    /// Whether signatures report the address or the uncompressed public key
    identity: VariantKind,
}

impl LocalEthereumSigner {
    /// Create a signer from a hex-encoded private key, identified by address
    ///
    /// # Arguments
    /// * `key_hex` - 32-byte secp256k1 private key, with or without `0x`
    ///
    /// # Security
    /// The caller's copy of `key_hex` is not cleared; drop it as soon as
    /// possible.
    pub fn from_hex(key_hex: &str) -> Result<Self, SignerError> {
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| SignerError::InvalidKey(format!("{}", e)))?;
        Ok(Self {
            signer,
            identity: VariantKind::Secp256k1Address,
        })
    }

    /// Create a signer from an environment variable
    ///
    /// # Arguments
    /// * `var_name` - Name of the variable holding the hex private key
    ///
    /// # Security
    /// Prefer a secrets manager that injects the variable at start-up over a
    /// checked-in `.env` file.
    pub fn from_env(var_name: &str) -> Result<Self, SignerError> {
        let key_hex =
            std::env::var(var_name).map_err(|_| SignerError::MissingKey(var_name.to_string()))?;
        Self::from_hex(&key_hex)
    }

    /// Report the uncompressed public key instead of the address
    ///
    /// Must match the signer variant registered with the account. `Stellar`
    /// is refused since this key is not an ed25519 key.
    pub fn with_identity(mut self, kind: VariantKind) -> Result<Self, SignerError> {
        if kind == VariantKind::Native {
            return Err(SignerError::UnsupportedIdentity(kind));
        }
        self.identity = kind;
        Ok(self)
    }

    pub fn identity_kind(&self) -> VariantKind {
        self.identity
    }

    /// Ethereum address (safe to share)
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// 65-byte SEC1 uncompressed public key, `0x04 || x || y`
    pub fn public_key(&self) -> Result<[u8; SECP256K1_KEY_LEN], SignerError> {
        let point = self
            .signer
            .credential()
            .verifying_key()
            .to_encoded_point(false);
        point
            .as_bytes()
            .try_into()
            .map_err(|_| SignerError::InvalidKey("unexpected public key encoding".to_string()))
    }

    fn identity_bytes(&self) -> Result<Vec<u8>, SignerError> {
        match self.identity {
            VariantKind::Secp256k1 => Ok(self.public_key()?.to_vec()),
            VariantKind::Secp256k1Address => Ok(self.address().to_vec()),
            VariantKind::Native => Err(SignerError::UnsupportedIdentity(self.identity)),
        }
    }
}

#[async_trait]
impl ExternalSigner for LocalEthereumSigner {
    async fn sign(&self, digest: B256) -> Result<ExternalSignature, SignerError> {
        let signature = self
            .signer
            .sign_hash_sync(&digest)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(ExternalSignature {
            identity: self.identity_bytes()?,
            signature: signature.as_bytes().to_vec(),
        })
    }
}

impl std::fmt::Debug for LocalEthereumSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEthereumSigner")
            .field("address", &self.signer.address())
            .field("identity", &self.identity)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}
