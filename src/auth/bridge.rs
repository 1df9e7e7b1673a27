//! Signs Soroban authorization entries with a foreign-chain key

use std::sync::Arc;
use std::time::Duration;

use alloy::hex;
use alloy::primitives::B256;
use stellar_xdr::curr::{Hash, SorobanAuthorizationEntry, SorobanCredentials};
use thiserror::Error;

use super::digest::{
    address_of_public_key, authorization_preimage, normalize_recovery_id, recover_signer,
    AuthorizationDigest,
};
use super::signer::{ExternalSignature, ExternalSigner, SignerError};
use crate::account::{SignatureVariant, VariantKind, SECP256K1_SIGNATURE_LEN};
use crate::codec::{CodecError, ToScVal};
use crate::config::{NetworkConfig, DEFAULT_LEDGERS_TO_LIVE};
use crate::ledger::{LedgerError, LedgerRpc};
use crate::strkey::ContractId;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("No external signer configured")]
    SignerNotConfigured,

    #[error("External signer did not answer within {0:?}")]
    SignerTimeout(Duration),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("Signature encoding failed: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    #[error("Invalid recovery id {0}; expected 27 or 28")]
    InvalidRecoveryId(u8),

    #[error("Signer recovery failed: {0}")]
    Recovery(String),

    #[error("Signature was produced by {recovered}, not the reported identity {reported}")]
    IdentityMismatch { reported: String, recovered: String },

    #[error("{0} signatures are verified natively by the host, not by this bridge")]
    UnsupportedScheme(VariantKind),

    #[error("Authorization entry does not use address credentials")]
    UnsupportedCredentials,

    #[error("Signature expiration ledger overflows")]
    ExpirationOverflow,
}

/// Makes authorization entries for one smart account signable by an external key
#[derive(Clone)]
pub struct AuthorizationBridge {
    network_id: Hash,
    contract: ContractId,
    ledgers_to_live: u32,
    scheme: VariantKind,
    signer: Option<Arc<dyn ExternalSigner>>,
    signer_timeout: Option<Duration>,
}

impl AuthorizationBridge {
    pub fn new(network_id: Hash, contract: ContractId) -> Self {
        Self {
            network_id,
            contract,
            ledgers_to_live: DEFAULT_LEDGERS_TO_LIVE,
            scheme: VariantKind::Secp256k1Address,
            signer: None,
            signer_timeout: None,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> crate::Result<Self> {
        Ok(Self::new(config.network_id(), config.contract()?)
            .with_ledgers_to_live(config.ledgers_to_live)
            .with_signer_timeout(config.signer_timeout()))
    }

    pub fn with_signer(mut self, signer: Arc<dyn ExternalSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Signature variant the account expects (defaults to `EthereumAddress`)
    ///
    /// Only secp256k1 schemes are accepted: a Stellar key signs the payload
    /// directly and never goes through the EIP-191 digest.
    pub fn with_scheme(mut self, scheme: VariantKind) -> Result<Self, BridgeError> {
        if scheme == VariantKind::Native {
            return Err(BridgeError::UnsupportedScheme(scheme));
        }
        self.scheme = scheme;
        Ok(self)
    }

    pub fn with_ledgers_to_live(mut self, ledgers_to_live: u32) -> Self {
        self.ledgers_to_live = ledgers_to_live;
        self
    }

    pub fn with_signer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.signer_timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.signer.is_some()
    }

    pub fn contract(&self) -> &ContractId {
        &self.contract
    }

    pub fn network_id(&self) -> &Hash {
        &self.network_id
    }

    /// Whether the entry asks this account for authorization
    pub fn targets(&self, entry: &SorobanAuthorizationEntry) -> bool {
        match &entry.credentials {
            SorobanCredentials::Address(credentials) => {
                ContractId::from_sc_address(&credentials.address) == Some(self.contract)
            }
            SorobanCredentials::SourceAccount => false,
        }
    }

    /// Hashes for an entry at a given expiration ledger
    pub fn digest_for(
        &self,
        entry: &SorobanAuthorizationEntry,
        expiration: u32,
    ) -> Result<AuthorizationDigest, BridgeError> {
        let SorobanCredentials::Address(credentials) = &entry.credentials else {
            return Err(BridgeError::UnsupportedCredentials);
        };
        let preimage = authorization_preimage(
            &self.network_id,
            credentials.nonce,
            expiration,
            &entry.root_invocation,
        );
        AuthorizationDigest::from_preimage(&preimage)
    }

    /// Sign one entry, valid until `latest_ledger + ledgers_to_live`
    ///
    /// The entry is only returned once fully signed; on error or cancellation
    /// it is dropped.
    pub async fn sign_auth_entry(
        &self,
        mut entry: SorobanAuthorizationEntry,
        latest_ledger: u32,
    ) -> Result<SorobanAuthorizationEntry, BridgeError> {
        let signer = self.signer.as_ref().ok_or(BridgeError::SignerNotConfigured)?;
        let expiration = latest_ledger
            .checked_add(self.ledgers_to_live)
            .ok_or(BridgeError::ExpirationOverflow)?;
        let digest = self.digest_for(&entry, expiration)?;

        tracing::debug!(
            payload = %hex::encode(digest.payload),
            message = %digest.message,
            digest = %digest.digest,
            expiration,
            "Requesting external signature"
        );

        let external = self.request_signature(signer.as_ref(), digest.digest).await?;
        let signature = self.signature_variant(&external)?;
        verify_identity(&digest.digest, &signature)?;

        let SorobanCredentials::Address(credentials) = &mut entry.credentials else {
            return Err(BridgeError::UnsupportedCredentials);
        };
        credentials.signature_expiration_ledger = expiration;
        credentials.signature = signature.to_sc_val()?;

        tracing::debug!(
            contract = %self.contract,
            nonce = credentials.nonce,
            expiration,
            "Authorization entry signed"
        );
        Ok(entry)
    }

    /// Sign every entry addressed to this account; others pass through untouched
    ///
    /// The ledger height is read once, so all signed entries share one expiration.
    pub async fn sign_auth_entries(
        &self,
        ledger: &dyn LedgerRpc,
        entries: Vec<SorobanAuthorizationEntry>,
    ) -> Result<Vec<SorobanAuthorizationEntry>, BridgeError> {
        if !self.is_configured() {
            return Err(BridgeError::SignerNotConfigured);
        }
        if !entries.iter().any(|entry| self.targets(entry)) {
            tracing::debug!(entries = entries.len(), "No authorization entries for this account");
            return Ok(entries);
        }

        let latest_ledger = ledger.latest_ledger().await?;
        tracing::info!(
            contract = %self.contract,
            ledger = latest_ledger,
            expiration = latest_ledger.saturating_add(self.ledgers_to_live),
            "Signing authorization entries"
        );

        let mut signed = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.targets(&entry) {
                signed.push(self.sign_auth_entry(entry, latest_ledger).await?);
            } else {
                signed.push(entry);
            }
        }
        Ok(signed)
    }

    async fn request_signature(
        &self,
        signer: &dyn ExternalSigner,
        digest: B256,
    ) -> Result<ExternalSignature, BridgeError> {
        let request = signer.sign(digest);
        let external = match self.signer_timeout {
            Some(timeout) => tokio::time::timeout(timeout, request)
                .await
                .map_err(|_| BridgeError::SignerTimeout(timeout))??,
            None => request.await?,
        };
        Ok(external)
    }

    /// `v` stays as byte 64 of the signature and must be 27 or 28
    fn signature_variant(&self, external: &ExternalSignature) -> Result<SignatureVariant, BridgeError> {
        let signature =
            SignatureVariant::new(self.scheme, &external.identity, &external.signature)?;
        if signature.kind() == VariantKind::Native {
            return Err(BridgeError::UnsupportedScheme(VariantKind::Native));
        }
        normalize_recovery_id(signature.signature()[SECP256K1_SIGNATURE_LEN - 1])?;
        Ok(signature)
    }
}

/// Check a secp256k1 signature recovers to the identity it claims
fn verify_identity(digest: &B256, signature: &SignatureVariant) -> Result<(), BridgeError> {
    let (reported, sig) = match signature {
        SignatureVariant::Secp256k1Address { address, signature } => {
            (alloy::primitives::Address::from(*address), signature)
        }
        SignatureVariant::Secp256k1 {
            public_key,
            signature,
            ..
        } => (address_of_public_key(public_key), signature),
        SignatureVariant::Native { .. } => {
            return Err(BridgeError::UnsupportedScheme(VariantKind::Native))
        }
    };
    let recovered = recover_signer(digest, sig)?;
    if recovered != reported {
        return Err(BridgeError::IdentityMismatch {
            reported: reported.to_string(),
            recovered: recovered.to_string(),
        });
    }
    Ok(())
}

impl std::fmt::Debug for AuthorizationBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationBridge")
            .field("contract", &self.contract.to_string())
            .field("ledgers_to_live", &self.ledgers_to_live)
            .field("scheme", &self.scheme)
            .field("signer", &self.signer.as_ref().map(|_| "configured"))
            .field("signer_timeout", &self.signer_timeout)
            .finish()
    }
}
