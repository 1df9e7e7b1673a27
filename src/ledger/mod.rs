//! Ledger RPC boundary
//!
//! The workflow only needs four calls from the network; they sit behind
//! [`LedgerRpc`] so tests can script the ledger.

mod client;
mod simulation;

pub use client::StellarRpcClient;
pub use simulation::{
    RestorePreamble, SimulationError, SimulationHostResult, SimulationResponse, SimulationSuccess,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{Transaction, TransactionEnvelope};
use thiserror::Error;

use crate::strkey::AccountKey;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Transaction rejected with status {status}")]
    Rejected {
        status: String,
        hash: Option<String>,
        error_result_xdr: Option<String>,
    },

    #[error("Transaction {hash} failed")]
    Failed {
        hash: String,
        result_xdr: Option<String>,
    },

    #[error("Transaction {hash} not confirmed after {attempts} polls")]
    NotConfirmed { hash: String, attempts: u32 },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),
}

/// Final status of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub hash: String,
    pub status: String,
    #[serde(default)]
    pub ledger: Option<u32>,
    #[serde(default)]
    pub result_xdr: Option<String>,
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Current ledger height
    async fn latest_ledger(&self) -> Result<u32, LedgerError>;

    /// Current sequence number of a classic account
    async fn account_sequence(&self, account: &AccountKey) -> Result<i64, LedgerError>;

    async fn simulate(&self, tx: &Transaction) -> Result<SimulationResponse, LedgerError>;

    /// Submit and wait for the final status
    async fn submit(&self, tx: &TransactionEnvelope) -> Result<LedgerReceipt, LedgerError>;
}
