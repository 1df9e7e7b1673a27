//! Authorization bridge between Soroban auth entries and Ethereum keys

mod bridge;
mod digest;
mod signer;

pub use bridge::{AuthorizationBridge, BridgeError};
pub use digest::{
    address_of_public_key, authorization_preimage, network_id, normalize_recovery_id,
    recover_signer, signature_payload, AuthorizationDigest, ETHEREUM_MESSAGE_PREFIX,
};
pub use signer::{ExternalSignature, ExternalSigner, LocalEthereumSigner, SignerError};
