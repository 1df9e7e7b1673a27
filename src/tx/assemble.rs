//! Merging a simulation into its transaction

use stellar_xdr::curr::{OperationBody, Transaction, TransactionExt};

use super::TxError;
use crate::ledger::SimulationSuccess;

/// Attach simulated resources and auth to `tx`
///
/// The resource fee is added to whatever fee `tx` already carries, so the
/// input must be at the base fee. Auth entries from the simulation only fill
/// an invocation that has none of its own.
pub fn assemble(tx: &Transaction, simulation: &SimulationSuccess) -> Result<Transaction, TxError> {
    let fee = i64::from(tx.fee)
        .checked_add(simulation.min_resource_fee)
        .and_then(|fee| u32::try_from(fee).ok())
        .ok_or(TxError::FeeOverflow)?;

    let mut operations = tx.operations.to_vec();
    for op in operations.iter_mut() {
        if let OperationBody::InvokeHostFunction(invoke) = &mut op.body {
            if invoke.auth.is_empty() && !simulation.auth.is_empty() {
                invoke.auth = simulation.auth.clone().try_into()?;
            }
        }
    }

    let mut assembled = tx.clone();
    assembled.fee = fee;
    assembled.operations = operations.try_into()?;
    assembled.ext = TransactionExt::V1(simulation.transaction_data.clone());
    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::PublicKeyVariant;
    use crate::contract::init_call;
    use crate::strkey::{AccountKey, ContractId};
    use crate::tx::Draft;
    use stellar_xdr::curr::{
        ExtensionPoint, Hash, InvokeContractArgs, LedgerFootprint, ScAddress, ScSymbol, ScVal,
        SorobanAddressCredentials, SorobanAuthorizationEntry, SorobanAuthorizedFunction,
        SorobanAuthorizedInvocation, SorobanCredentials, SorobanResources, SorobanTransactionData,
        StringM, VecM,
    };

    fn draft() -> Draft {
        let op = init_call(
            &ContractId([0x11; 32]),
            &PublicKeyVariant::Secp256k1Address([0xAB; 20]),
        )
        .unwrap();
        Draft::from_operation(&AccountKey([0x22; 32]), 7, 100, 0, op).unwrap()
    }

    fn entry(nonce: i64) -> SorobanAuthorizationEntry {
        SorobanAuthorizationEntry {
            credentials: SorobanCredentials::Address(SorobanAddressCredentials {
                address: ScAddress::Contract(Hash([0x11; 32])),
                nonce,
                signature_expiration_ledger: 0,
                signature: ScVal::Void,
            }),
            root_invocation: SorobanAuthorizedInvocation {
                function: SorobanAuthorizedFunction::ContractFn(InvokeContractArgs {
                    contract_address: ScAddress::Contract(Hash([0x11; 32])),
                    function_name: ScSymbol(StringM::try_from("init").unwrap()),
                    args: VecM::default(),
                }),
                sub_invocations: VecM::default(),
            },
        }
    }

    fn simulation(min_resource_fee: i64, auth: Vec<SorobanAuthorizationEntry>) -> SimulationSuccess {
        SimulationSuccess {
            transaction_data: SorobanTransactionData {
                ext: ExtensionPoint::V0,
                resources: SorobanResources {
                    footprint: LedgerFootprint {
                        read_only: VecM::default(),
                        read_write: VecM::default(),
                    },
                    instructions: 2_000_000,
                    read_bytes: 4_096,
                    write_bytes: 256,
                },
                resource_fee: min_resource_fee,
            },
            min_resource_fee,
            auth,
            result: None,
            latest_ledger: 1000,
        }
    }

    #[test]
    fn adds_resource_fee_to_base_fee() {
        let assembled = assemble(draft().transaction(), &simulation(5_000, vec![])).unwrap();
        assert_eq!(assembled.fee, 5_100);
        assert!(matches!(assembled.ext, TransactionExt::V1(_)));
    }

    #[test]
    fn reassembling_stacks_fees_unless_reset() {
        let sim = simulation(5_000, vec![]);
        let once = assemble(draft().transaction(), &sim).unwrap();
        let twice = assemble(&once, &sim).unwrap();
        assert_eq!(twice.fee, 10_100);

        let reset = Draft::new(once).unwrap().reset_fee(100);
        let again = assemble(reset.transaction(), &sim).unwrap();
        assert_eq!(again.fee, 5_100);
    }

    #[test]
    fn simulated_auth_fills_only_empty_invocations() {
        let filled = assemble(draft().transaction(), &simulation(10, vec![entry(1)])).unwrap();
        assert_eq!(Draft::new(filled).unwrap().auth_entries(), vec![entry(1)]);

        let signed = draft().with_auth(vec![entry(2)]).unwrap();
        let kept = assemble(signed.transaction(), &simulation(10, vec![entry(1)])).unwrap();
        assert_eq!(Draft::new(kept).unwrap().auth_entries(), vec![entry(2)]);
    }

    #[test]
    fn fee_overflow_is_an_error() {
        let err = assemble(draft().transaction(), &simulation(i64::from(u32::MAX), vec![]))
            .unwrap_err();
        assert!(matches!(err, TxError::FeeOverflow));
    }
}
