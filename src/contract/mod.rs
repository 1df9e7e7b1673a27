//! Calls into the account and token contracts

mod interface;

pub use interface::{
    ArgType, ContractInterface, FunctionSpec, InputSpec, InterfaceError, ACCOUNT_INTERFACE,
    TOKEN_INTERFACE,
};

use stellar_xdr::curr::{Operation, ScAddress};

use crate::account::PublicKeyVariant;
use crate::codec::ToScVal;
use crate::strkey::ContractId;
use crate::Result;

/// `init(signer)` on the account contract
pub fn init_call(account: &ContractId, signer: &PublicKeyVariant) -> Result<Operation> {
    Ok(ACCOUNT_INTERFACE.build_call(account, "init", vec![signer.to_sc_val()?])?)
}

/// `extend_ttl()` on the account contract
pub fn extend_ttl_call(account: &ContractId) -> Result<Operation> {
    Ok(ACCOUNT_INTERFACE.build_call(account, "extend_ttl", vec![])?)
}

/// `transfer(from, to, amount)` on a token contract
pub fn transfer_call(
    token: &ContractId,
    from: &ScAddress,
    to: &ScAddress,
    amount: i128,
) -> Result<Operation> {
    Ok(TOKEN_INTERFACE.build_call(
        token,
        "transfer",
        vec![from.to_sc_val()?, to.to_sc_val()?, amount.to_sc_val()?],
    )?)
}
