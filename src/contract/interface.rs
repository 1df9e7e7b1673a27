//! Static descriptors of the contracts this crate calls
//!
//! Calls are checked against the descriptor before an operation is built, so
//! a wrong function name or argument never reaches the network.

use stellar_xdr::curr::{
    HostFunction, InvokeContractArgs, InvokeHostFunctionOp, Operation, OperationBody, ScSymbol,
    ScVal, StringM, VecM,
};
use thiserror::Error;

use crate::account::{ContractErrorCode, PublicKeyVariant, SignatureVariant};
use crate::codec::FromScVal;
use crate::strkey::ContractId;

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("Unknown function {function} on {contract} v{version}")]
    UnknownFunction {
        contract: &'static str,
        version: u32,
        function: String,
    },

    #[error("{0} is invoked by the host and cannot be called directly")]
    NotInvocable(&'static str),

    #[error("{function} takes {expected} arguments, got {actual}")]
    Arity {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Argument {argument} of {function} must be {expected}")]
    ArgumentType {
        function: &'static str,
        argument: &'static str,
        expected: &'static str,
    },

    #[error("Unknown contract error code: {0}")]
    UnknownErrorCode(u32),

    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),
}

/// Argument types that appear in the contracts' signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    PublicKey,
    Signature,
    BytesN(u32),
    Address,
    I128,
    U32,
    AuthContexts,
}

impl ArgType {
    pub fn name(&self) -> &'static str {
        match self {
            ArgType::PublicKey => "AccPublicKey",
            ArgType::Signature => "AccSignature",
            ArgType::BytesN(32) => "BytesN<32>",
            ArgType::BytesN(_) => "BytesN",
            ArgType::Address => "Address",
            ArgType::I128 => "i128",
            ArgType::U32 => "u32",
            ArgType::AuthContexts => "Vec<Context>",
        }
    }

    pub fn accepts(&self, val: &ScVal) -> bool {
        match (self, val) {
            (ArgType::PublicKey, _) => PublicKeyVariant::from_sc_val(val).is_ok(),
            (ArgType::Signature, _) => SignatureVariant::from_sc_val(val).is_ok(),
            (ArgType::BytesN(n), ScVal::Bytes(b)) => b.0.len() == *n as usize,
            (ArgType::Address, ScVal::Address(_)) => true,
            (ArgType::I128, ScVal::I128(_)) => true,
            (ArgType::U32, ScVal::U32(_)) => true,
            (ArgType::AuthContexts, ScVal::Vec(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InputSpec {
    pub name: &'static str,
    pub ty: ArgType,
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub inputs: &'static [InputSpec],
    /// False for entry points only the host calls (`__check_auth`)
    pub invocable: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ContractInterface {
    pub name: &'static str,
    /// Bumped whenever a function signature or error code changes
    pub version: u32,
    pub functions: &'static [FunctionSpec],
    pub errors: &'static [ContractErrorCode],
}

pub const ACCOUNT_INTERFACE: ContractInterface = ContractInterface {
    name: "omniwallet-account",
    version: 1,
    functions: &[
        FunctionSpec {
            name: "init",
            inputs: &[InputSpec {
                name: "signer",
                ty: ArgType::PublicKey,
            }],
            invocable: true,
        },
        FunctionSpec {
            name: "extend_ttl",
            inputs: &[],
            invocable: true,
        },
        FunctionSpec {
            name: "__check_auth",
            inputs: &[
                InputSpec {
                    name: "signature_payload",
                    ty: ArgType::BytesN(32),
                },
                InputSpec {
                    name: "signature",
                    ty: ArgType::Signature,
                },
                InputSpec {
                    name: "auth_contexts",
                    ty: ArgType::AuthContexts,
                },
            ],
            invocable: false,
        },
    ],
    errors: &ContractErrorCode::ALL,
};

/// Stellar asset contract (token interface subset)
pub const TOKEN_INTERFACE: ContractInterface = ContractInterface {
    name: "token",
    version: 1,
    functions: &[FunctionSpec {
        name: "transfer",
        inputs: &[
            InputSpec {
                name: "from",
                ty: ArgType::Address,
            },
            InputSpec {
                name: "to",
                ty: ArgType::Address,
            },
            InputSpec {
                name: "amount",
                ty: ArgType::I128,
            },
        ],
        invocable: true,
    }],
    errors: &[],
};

impl ContractInterface {
    pub fn function(&self, name: &str) -> Result<&'static FunctionSpec, InterfaceError> {
        let functions: &'static [FunctionSpec] = self.functions;
        functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| InterfaceError::UnknownFunction {
                contract: self.name,
                version: self.version,
                function: name.to_string(),
            })
    }

    /// Check a call's arguments against the function's signature
    pub fn invoke_args(
        &self,
        name: &str,
        args: Vec<ScVal>,
    ) -> Result<(&'static FunctionSpec, VecM<ScVal>), InterfaceError> {
        let spec = self.function(name)?;
        if !spec.invocable {
            return Err(InterfaceError::NotInvocable(spec.name));
        }
        if args.len() != spec.inputs.len() {
            return Err(InterfaceError::Arity {
                function: spec.name,
                expected: spec.inputs.len(),
                actual: args.len(),
            });
        }
        for (input, arg) in spec.inputs.iter().zip(&args) {
            if !input.ty.accepts(arg) {
                return Err(InterfaceError::ArgumentType {
                    function: spec.name,
                    argument: input.name,
                    expected: input.ty.name(),
                });
            }
        }
        Ok((spec, VecM::try_from(args)?))
    }

    /// Build an `InvokeHostFunction` operation with an empty auth list
    pub fn build_call(
        &self,
        contract: &ContractId,
        name: &str,
        args: Vec<ScVal>,
    ) -> Result<Operation, InterfaceError> {
        let (spec, args) = self.invoke_args(name, args)?;
        tracing::debug!(
            contract = %contract,
            interface = self.name,
            version = self.version,
            function = spec.name,
            "Built contract call"
        );
        Ok(Operation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::InvokeContract(InvokeContractArgs {
                    contract_address: contract.sc_address(),
                    function_name: ScSymbol(StringM::try_from(spec.name)?),
                    args,
                }),
                auth: VecM::default(),
            }),
        })
    }

    pub fn decode_error(&self, code: u32) -> Result<ContractErrorCode, InterfaceError> {
        self.errors
            .iter()
            .copied()
            .find(|e| e.code() == code)
            .ok_or(InterfaceError::UnknownErrorCode(code))
    }
}
