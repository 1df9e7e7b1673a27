//! Sponsor signatures over transaction envelopes

use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    DecoratedSignature, Hash, Limits, Signature, SignatureHint, Transaction, TransactionEnvelope,
    TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
    TransactionV1Envelope, WriteXdr,
};

use super::TxError;
use crate::strkey::{self, AccountKey};

/// Hash a transaction signs over on a given network
pub fn transaction_hash(tx: &Transaction, network_id: &Hash) -> Result<[u8; 32], TxError> {
    let payload = TransactionSignaturePayload {
        network_id: network_id.clone(),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    Ok(Sha256::digest(payload.to_xdr(Limits::none())?).into())
}

/// The classic account that is the transaction source and pays fees
pub struct SponsorKey {
    signing_key: SigningKey,
    account: AccountKey,
}

impl SponsorKey {
    /// From an `S...` secret seed
    pub fn from_seed(seed: &str) -> Result<Self, TxError> {
        let secret = strkey::decode_seed(seed.trim())
            .map_err(|e| TxError::InvalidSponsorKey(e.to_string()))?;
        let signing_key = SigningKey::from_bytes(&secret);
        let account = AccountKey(signing_key.verifying_key().to_bytes());
        Ok(Self {
            signing_key,
            account,
        })
    }

    /// From an environment variable holding an `S...` seed
    ///
    /// # Security
    /// The seed controls the account that pays every fee; keep it out of
    /// shell history and config files.
    pub fn from_env(var_name: &str) -> Result<Self, TxError> {
        let seed = std::env::var(var_name)
            .map_err(|_| TxError::InvalidSponsorKey(format!("{} is not set", var_name)))?;
        Self::from_seed(&seed)
    }

    pub fn account(&self) -> &AccountKey {
        &self.account
    }

    /// Sign `tx` into a single-signature envelope
    pub fn sign(&self, tx: &Transaction, network_id: &Hash) -> Result<TransactionEnvelope, TxError> {
        let hash = transaction_hash(tx, network_id)?;
        let signature = self.signing_key.sign(&hash);

        let mut hint = [0u8; 4];
        hint.copy_from_slice(&self.account.0[28..]);
        let decorated = DecoratedSignature {
            hint: SignatureHint(hint),
            signature: Signature(signature.to_bytes().to_vec().try_into()?),
        };

        Ok(TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: tx.clone(),
            signatures: vec![decorated].try_into()?,
        }))
    }
}

impl std::fmt::Debug for SponsorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SponsorKey")
            .field("account", &self.account.to_string())
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}
