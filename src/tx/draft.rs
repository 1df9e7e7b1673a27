//! Unsimulated single-operation transactions

use chrono::Utc;
use stellar_xdr::curr::{
    InvokeHostFunctionOp, Memo, MuxedAccount, Operation, OperationBody, Preconditions,
    SequenceNumber, SorobanAuthorizationEntry, TimeBounds, TimePoint, Transaction, TransactionExt,
    Uint256,
};

use super::TxError;
use crate::strkey::AccountKey;

/// Operations the workflow knows how to simulate and assemble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    InvokeHostFunction,
    ExtendFootprintTtl,
    RestoreFootprint,
}

impl OperationKind {
    pub fn of(op: &Operation) -> Option<Self> {
        match &op.body {
            OperationBody::InvokeHostFunction(_) => Some(OperationKind::InvokeHostFunction),
            OperationBody::ExtendFootprintTtl(_) => Some(OperationKind::ExtendFootprintTtl),
            OperationBody::RestoreFootprint(_) => Some(OperationKind::RestoreFootprint),
            _ => None,
        }
    }
}

/// A transaction carrying exactly one Soroban operation
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    tx: Transaction,
    kind: OperationKind,
}

impl Draft {
    pub fn new(tx: Transaction) -> Result<Self, TxError> {
        let kind = match tx.operations.as_slice() {
            [op] => OperationKind::of(op).ok_or_else(|| {
                TxError::MalformedTransaction(format!(
                    "unsupported operation {:?}",
                    op.body.discriminant()
                ))
            })?,
            ops => {
                return Err(TxError::MalformedTransaction(format!(
                    "expected exactly one operation, found {}",
                    ops.len()
                )))
            }
        };
        Ok(Self { tx, kind })
    }

    /// Wrap `op` in a transaction from `source`, using the next sequence number
    pub fn from_operation(
        source: &AccountKey,
        current_sequence: i64,
        base_fee: u32,
        timeout_secs: u64,
        op: Operation,
    ) -> Result<Self, TxError> {
        let seq_num = current_sequence.checked_add(1).ok_or_else(|| {
            TxError::MalformedTransaction("sequence number overflows".to_string())
        })?;
        let max_time = if timeout_secs == 0 {
            0
        } else {
            (Utc::now().timestamp().max(0) as u64).saturating_add(timeout_secs)
        };

        Self::new(Transaction {
            source_account: MuxedAccount::Ed25519(Uint256(source.0)),
            fee: base_fee,
            seq_num: SequenceNumber(seq_num),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(max_time),
            }),
            memo: Memo::None,
            operations: vec![op].try_into()?,
            ext: TransactionExt::V0,
        })
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }

    /// Same operation at the base fee, with any earlier resource data dropped
    ///
    /// Every simulation starts from here so resource fees never stack up.
    pub fn reset_fee(&self, base_fee: u32) -> Draft {
        let mut tx = self.tx.clone();
        tx.fee = base_fee;
        tx.ext = TransactionExt::V0;
        Draft { tx, kind: self.kind }
    }

    /// Authorization entries of the invocation; empty for other operations
    pub fn auth_entries(&self) -> Vec<SorobanAuthorizationEntry> {
        match self.invocation() {
            Some(invoke) => invoke.auth.to_vec(),
            None => Vec::new(),
        }
    }

    /// Replace the invocation's authorization entries
    pub fn with_auth(&self, entries: Vec<SorobanAuthorizationEntry>) -> Result<Draft, TxError> {
        if self.kind != OperationKind::InvokeHostFunction {
            if entries.is_empty() {
                return Ok(self.clone());
            }
            return Err(TxError::MalformedTransaction(format!(
                "{:?} operations carry no authorization entries",
                self.kind
            )));
        }

        let mut operations = self.tx.operations.to_vec();
        for op in operations.iter_mut() {
            if let OperationBody::InvokeHostFunction(invoke) = &mut op.body {
                invoke.auth = entries.clone().try_into()?;
            }
        }
        let mut tx = self.tx.clone();
        tx.operations = operations.try_into()?;
        Ok(Draft { tx, kind: self.kind })
    }

    fn invocation(&self) -> Option<&InvokeHostFunctionOp> {
        self.tx.operations.iter().find_map(|op| match &op.body {
            OperationBody::InvokeHostFunction(invoke) => Some(invoke),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{extend_ttl_call, init_call};
    use crate::account::PublicKeyVariant;
    use crate::strkey::ContractId;
    use stellar_xdr::curr::{
        ExtendFootprintTtlOp, ExtensionPoint, Hash, InvokeContractArgs, LedgerFootprint, ScAddress,
        ScSymbol, ScVal, SorobanAddressCredentials, SorobanAuthorizedFunction,
        SorobanAuthorizedInvocation, SorobanCredentials, SorobanResources, SorobanTransactionData,
        StringM, VecM,
    };

    fn source() -> AccountKey {
        AccountKey([0x22; 32])
    }

    fn account() -> ContractId {
        ContractId([0x11; 32])
    }

    fn init_op() -> Operation {
        init_call(&account(), &PublicKeyVariant::Secp256k1Address([0xAB; 20])).unwrap()
    }

    fn entry() -> SorobanAuthorizationEntry {
        SorobanAuthorizationEntry {
            credentials: SorobanCredentials::Address(SorobanAddressCredentials {
                address: ScAddress::Contract(Hash([0x11; 32])),
                nonce: 3,
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

    #[test]
    fn builds_from_operation() {
        let draft = Draft::from_operation(&source(), 41, 100, 0, init_op()).unwrap();
        let tx = draft.transaction();
        assert_eq!(tx.seq_num, SequenceNumber(42));
        assert_eq!(tx.fee, 100);
        assert_eq!(draft.kind(), OperationKind::InvokeHostFunction);
        assert_eq!(
            tx.cond,
            Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(0),
            })
        );
    }

    #[test]
    fn timeout_sets_upper_time_bound() {
        let before = Utc::now().timestamp() as u64;
        let draft = Draft::from_operation(&source(), 1, 100, 30, init_op()).unwrap();
        match &draft.transaction().cond {
            Preconditions::Time(bounds) => assert!(bounds.max_time.0 >= before + 30),
            other => panic!("unexpected preconditions {other:?}"),
        }
    }

    #[test]
    fn rejects_everything_but_one_soroban_operation() {
        let empty = Draft::from_operation(&source(), 1, 100, 0, init_op())
            .unwrap()
            .into_transaction();
        let mut none = empty.clone();
        none.operations = VecM::default();
        assert!(matches!(Draft::new(none), Err(TxError::MalformedTransaction(_))));

        let mut two = empty.clone();
        two.operations = vec![init_op(), extend_ttl_call(&account()).unwrap()]
            .try_into()
            .unwrap();
        assert!(matches!(Draft::new(two), Err(TxError::MalformedTransaction(_))));

        let mut classic = empty;
        classic.operations = vec![Operation {
            source_account: None,
            body: OperationBody::Inflation,
        }]
        .try_into()
        .unwrap();
        assert!(matches!(Draft::new(classic), Err(TxError::MalformedTransaction(_))));
    }

    #[test]
    fn reset_fee_drops_resource_data() {
        let draft = Draft::from_operation(&source(), 1, 100, 0, init_op()).unwrap();
        let mut tx = draft.clone().into_transaction();
        tx.fee = 5_100;
        tx.ext = TransactionExt::V1(SorobanTransactionData {
            ext: ExtensionPoint::V0,
            resources: SorobanResources {
                footprint: LedgerFootprint {
                    read_only: VecM::default(),
                    read_write: VecM::default(),
                },
                instructions: 1,
                read_bytes: 1,
                write_bytes: 1,
            },
            resource_fee: 5_000,
        });
        let reset = Draft::new(tx).unwrap().reset_fee(100);
        assert_eq!(reset, draft);
    }

    #[test]
    fn replaces_auth_entries() {
        let draft = Draft::from_operation(&source(), 1, 100, 0, init_op()).unwrap();
        assert!(draft.auth_entries().is_empty());
        let with_auth = draft.with_auth(vec![entry()]).unwrap();
        assert_eq!(with_auth.auth_entries(), vec![entry()]);
        assert!(draft.auth_entries().is_empty());
    }

    #[test]
    fn footprint_operations_take_no_auth() {
        let bump = Operation {
            source_account: None,
            body: OperationBody::ExtendFootprintTtl(ExtendFootprintTtlOp {
                ext: ExtensionPoint::V0,
                extend_to: 10_000,
            }),
        };
        let draft = Draft::from_operation(&source(), 1, 100, 0, bump).unwrap();
        assert_eq!(draft.kind(), OperationKind::ExtendFootprintTtl);
        assert!(draft.with_auth(vec![]).is_ok());
        assert!(draft.with_auth(vec![entry()]).is_err());
    }
}
