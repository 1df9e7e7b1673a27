//! Omniwallet
//!
//! Soroban smart accounts controlled by Ethereum keys:
//! - Encode the account contract's signer and signature types as `ScVal`s
//! - Sign Soroban authorization entries with an external secp256k1 signer
//! - Simulate, assemble, sponsor-sign and submit transactions, directly or
//!   through a fee-sponsoring relay
//!
//! # Security Model
//!
//! - The Ethereum key never leaves its [`auth::ExternalSigner`]
//! - Every external signature is checked to recover to the identity it claims
//!   before it is written into an authorization entry
//! - Sponsor seed, Ethereum key and relay token are redacted from logs

pub mod account;
pub mod auth;
pub mod codec;
pub mod config;
pub mod contract;
pub mod ledger;
pub mod relay;
pub mod strkey;
pub mod tx;

mod error;

// Re-export commonly used types
pub use account::{ContractErrorCode, PublicKeyVariant, SignatureVariant, VariantKind};
pub use auth::{AuthorizationBridge, ExternalSigner, LocalEthereumSigner};
pub use config::{Config, Network, NetworkConfig, RelayConfig};
pub use error::{Error, Result};
pub use ledger::{LedgerRpc, StellarRpcClient};
pub use relay::RelayClient;
pub use tx::{SponsorKey, SubmitRoute, Submitted, TransactionWorkflow};
