//! Transaction simulation results
//!
//! Simulation is read-only: it estimates resources, returns the auth entries
//! the invocation needs, and reports contract reverts before anything is
//! signed or submitted.

use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{
    Limits, ReadXdr, ScVal, SorobanAuthorizationEntry, SorobanTransactionData, WriteXdr,
};

use crate::account::ContractErrorCode;

/// Raw `simulateTransaction` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_resource_fee: Option<String>,
    #[serde(default)]
    pub results: Vec<SimulationHostResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_preamble: Option<RestorePreamble>,
    #[serde(default)]
    pub latest_ledger: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationHostResult {
    /// Base64 `SorobanAuthorizationEntry` skeletons
    #[serde(default)]
    pub auth: Vec<String>,
    /// Base64 `ScVal` return value
    #[serde(default)]
    pub xdr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorePreamble {
    pub transaction_data: String,
    pub min_resource_fee: String,
}

/// A simulation that can be assembled
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSuccess {
    pub transaction_data: SorobanTransactionData,
    pub min_resource_fee: i64,
    pub auth: Vec<SorobanAuthorizationEntry>,
    pub result: Option<ScVal>,
    pub latest_ledger: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("contract execution reverted: {message}")]
    Reverted {
        message: String,
        contract_error: Option<ContractErrorCode>,
    },

    #[error("ledger state must be restored first (restore fee {min_resource_fee} stroops)")]
    RestoreRequired { min_resource_fee: i64 },

    #[error("malformed simulation response: {0}")]
    Malformed(String),
}

impl SimulationResponse {
    /// A successful simulation, as the RPC would report it
    pub fn success(
        transaction_data: &SorobanTransactionData,
        min_resource_fee: i64,
        auth: &[SorobanAuthorizationEntry],
        latest_ledger: u32,
    ) -> Result<Self, stellar_xdr::curr::Error> {
        Ok(Self {
            transaction_data: Some(transaction_data.to_xdr_base64(Limits::none())?),
            min_resource_fee: Some(min_resource_fee.to_string()),
            results: vec![SimulationHostResult {
                auth: auth
                    .iter()
                    .map(|entry| entry.to_xdr_base64(Limits::none()))
                    .collect::<Result<_, _>>()?,
                xdr: Some(ScVal::Void.to_xdr_base64(Limits::none())?),
            }],
            latest_ledger,
            ..Default::default()
        })
    }

    /// A failed simulation carrying host diagnostics
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn needs_restore(&self) -> bool {
        self.error.is_none() && self.restore_preamble.is_some()
    }

    /// Decode into an assemblable result, or the reason it cannot be assembled
    pub fn into_outcome(self) -> Result<SimulationSuccess, SimulationError> {
        if let Some(message) = self.error {
            let contract_error = ContractErrorCode::from_host_error(&message);
            return Err(SimulationError::Reverted {
                message,
                contract_error,
            });
        }
        if let Some(preamble) = self.restore_preamble {
            return Err(SimulationError::RestoreRequired {
                min_resource_fee: parse_fee(&preamble.min_resource_fee)?,
            });
        }

        let transaction_data = self
            .transaction_data
            .as_deref()
            .ok_or_else(|| SimulationError::Malformed("missing transactionData".to_string()))
            .and_then(|data| decode::<SorobanTransactionData>(data, "transactionData"))?;
        let min_resource_fee = parse_fee(
            self.min_resource_fee
                .as_deref()
                .ok_or_else(|| SimulationError::Malformed("missing minResourceFee".to_string()))?,
        )?;

        let (auth, result) = match self.results.into_iter().next() {
            Some(host) => {
                let auth = host
                    .auth
                    .iter()
                    .map(|entry| decode::<SorobanAuthorizationEntry>(entry, "auth"))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = host
                    .xdr
                    .as_deref()
                    .map(|xdr| decode::<ScVal>(xdr, "result"))
                    .transpose()?;
                (auth, result)
            }
            None => (Vec::new(), None),
        };

        Ok(SimulationSuccess {
            transaction_data,
            min_resource_fee,
            auth,
            result,
            latest_ledger: self.latest_ledger,
        })
    }
}

fn parse_fee(value: &str) -> Result<i64, SimulationError> {
    value
        .parse()
        .map_err(|e| SimulationError::Malformed(format!("minResourceFee {:?}: {}", value, e)))
}

fn decode<T: ReadXdr>(value: &str, field: &str) -> Result<T, SimulationError> {
    T::from_xdr_base64(value, Limits::none())
        .map_err(|e| SimulationError::Malformed(format!("{}: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::{ExtensionPoint, LedgerFootprint, SorobanResources, VecM};

    fn resources() -> SorobanTransactionData {
        SorobanTransactionData {
            ext: ExtensionPoint::V0,
            resources: SorobanResources {
                footprint: LedgerFootprint {
                    read_only: VecM::default(),
                    read_write: VecM::default(),
                },
                instructions: 1_000_000,
                read_bytes: 2_048,
                write_bytes: 512,
            },
            resource_fee: 4_900,
        }
    }

    #[test]
    fn parses_rpc_json() {
        let json = serde_json::json!({
            "transactionData": resources().to_xdr_base64(Limits::none()).unwrap(),
            "minResourceFee": "5000",
            "results": [{ "auth": [], "xdr": "AAAAAQ==" }],
            "latestLedger": 1000
        });
        let response: SimulationResponse = serde_json::from_value(json).unwrap();
        let outcome = response.into_outcome().unwrap();
        assert_eq!(outcome.min_resource_fee, 5000);
        assert_eq!(outcome.transaction_data, resources());
        assert_eq!(outcome.latest_ledger, 1000);
        assert_eq!(outcome.result, Some(ScVal::Void));
        assert!(outcome.auth.is_empty());
    }

    #[test]
    fn revert_exposes_contract_error() {
        let response = SimulationResponse::failed(
            "HostError: Error(Contract, #6)\nDiagnosticEvent: fn_call init",
        );
        assert!(response.is_error());
        match response.into_outcome() {
            Err(SimulationError::Reverted { contract_error, .. }) => {
                assert_eq!(contract_error, Some(ContractErrorCode::SignerMismatch));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn restore_is_not_assembled() {
        let response = SimulationResponse {
            restore_preamble: Some(RestorePreamble {
                transaction_data: resources().to_xdr_base64(Limits::none()).unwrap(),
                min_resource_fee: "1200".to_string(),
            }),
            ..SimulationResponse::success(&resources(), 5000, &[], 10).unwrap()
        };
        assert!(response.needs_restore());
        assert!(matches!(
            response.into_outcome(),
            Err(SimulationError::RestoreRequired { min_resource_fee: 1200 })
        ));
    }

    #[test]
    fn missing_fee_is_malformed() {
        let mut response = SimulationResponse::success(&resources(), 5000, &[], 10).unwrap();
        response.min_resource_fee = None;
        assert!(matches!(
            response.into_outcome(),
            Err(SimulationError::Malformed(_))
        ));
    }
}
