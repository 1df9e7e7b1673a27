//! Error types for the smart-account bridge

use thiserror::Error;

use crate::account::ContractErrorCode;
use crate::auth::{BridgeError, SignerError};
use crate::codec::CodecError;
use crate::contract::InterfaceError;
use crate::ledger::{LedgerError, SimulationError};
use crate::relay::RelayError;
use crate::strkey::StrKeyError;
use crate::tx::TxError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Contract interface error: {0}")]
    Interface(#[from] InterfaceError),

    #[error("Authorization error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TxError),

    #[error("Transaction simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Invalid key encoding: {0}")]
    StrKey(#[from] StrKeyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Relay submission requested but no relay is configured")]
    RelayNotConfigured,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The account contract's error code, when the failure came from the contract itself
    pub fn contract_error(&self) -> Option<ContractErrorCode> {
        match self {
            Error::Simulation(SimulationError::Reverted { contract_error, .. }) => *contract_error,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
