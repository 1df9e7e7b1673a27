//! Transaction lifecycle: draft, simulate, assemble, sign, submit

mod amount;
mod assemble;
mod draft;
mod envelope;
mod workflow;

pub use amount::{stroops_to_xlm, xlm_to_stroops, STROOPS_PER_XLM};
pub use assemble::assemble;
pub use draft::{Draft, OperationKind};
pub use envelope::{transaction_hash, SponsorKey};
pub use workflow::{Assembled, Signed, Simulated, SubmitRoute, Submitted, TransactionWorkflow};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("Fee overflows")]
    FeeOverflow,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid sponsor key: {0}")]
    InvalidSponsorKey(String),

    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),
}
