//! Soroban RPC and Horizon over HTTP

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use stellar_xdr::curr::{
    Limits, Transaction, TransactionEnvelope, TransactionV1Envelope, VecM, WriteXdr,
};

use super::{LedgerError, LedgerReceipt, LedgerRpc, SimulationResponse};
use crate::config::NetworkConfig;
use crate::strkey::AccountKey;

/// JSON-RPC client for a Soroban RPC node, with Horizon for account lookups
#[derive(Debug, Clone)]
pub struct StellarRpcClient {
    client: Client,
    rpc_url: String,
    horizon_url: String,
    poll_attempts: u32,
    poll_interval: Duration,
}

#[derive(Deserialize)]
struct LatestLedger {
    sequence: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendTransaction {
    status: String,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    error_result_xdr: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTransaction {
    status: String,
    #[serde(default)]
    ledger: Option<u32>,
    #[serde(default)]
    result_xdr: Option<String>,
}

#[derive(Deserialize)]
struct HorizonAccount {
    sequence: String,
}

impl StellarRpcClient {
    pub fn new(rpc_url: impl Into<String>, horizon_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.into(),
            horizon_url: horizon_url.into(),
            poll_attempts: 20,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(&config.rpc_url, &config.horizon_url)
            .with_polling(config.poll_attempts, config.poll_interval())
    }

    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts.max(1);
        self.poll_interval = interval;
        self
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params
            }))
            .send()
            .await
            .map_err(|e| LedgerError::Http(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("{}: {}", method, e)))?;

        if let Some(error) = body.get("error") {
            return Err(LedgerError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::InvalidResponse(format!("{}: missing result", method)))?;
        serde_json::from_value(result)
            .map_err(|e| LedgerError::InvalidResponse(format!("{}: {}", method, e)))
    }

    async fn poll(&self, hash: &str) -> Result<LedgerReceipt, LedgerError> {
        for attempt in 1..=self.poll_attempts {
            let status: GetTransaction = self.call("getTransaction", json!({ "hash": hash })).await?;
            if status.status == "SUCCESS" {
                tracing::info!(hash, ledger = ?status.ledger, "Transaction applied");
                return Ok(LedgerReceipt {
                    hash: hash.to_string(),
                    status: status.status,
                    ledger: status.ledger,
                    result_xdr: status.result_xdr,
                });
            }
            if status.status == "FAILED" {
                tracing::warn!(hash, "Transaction failed on ledger");
                return Err(LedgerError::Failed {
                    hash: hash.to_string(),
                    result_xdr: status.result_xdr,
                });
            }
            tracing::debug!(hash, attempt, status = %status.status, "Waiting for transaction");
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(LedgerError::NotConfirmed {
            hash: hash.to_string(),
            attempts: self.poll_attempts,
        })
    }
}

/// Unsigned envelope around a transaction, as `simulateTransaction` expects
pub(crate) fn unsigned_envelope(tx: &Transaction) -> TransactionEnvelope {
    TransactionEnvelope::Tx(TransactionV1Envelope {
        tx: tx.clone(),
        signatures: VecM::default(),
    })
}

#[async_trait]
impl LedgerRpc for StellarRpcClient {
    async fn latest_ledger(&self) -> Result<u32, LedgerError> {
        let latest: LatestLedger = self.call("getLatestLedger", Value::Null).await?;
        Ok(latest.sequence)
    }

    async fn account_sequence(&self, account: &AccountKey) -> Result<i64, LedgerError> {
        let url = format!("{}/accounts/{}", self.horizon_url.trim_end_matches('/'), account);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::Http(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LedgerError::AccountNotFound(account.to_string()));
        }
        if !response.status().is_success() {
            return Err(LedgerError::Http(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let body: HorizonAccount = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        body.sequence
            .parse()
            .map_err(|e| LedgerError::InvalidResponse(format!("sequence {}: {}", body.sequence, e)))
    }

    async fn simulate(&self, tx: &Transaction) -> Result<SimulationResponse, LedgerError> {
        let envelope = unsigned_envelope(tx).to_xdr_base64(Limits::none())?;
        self.call("simulateTransaction", json!({ "transaction": envelope }))
            .await
    }

    async fn submit(&self, tx: &TransactionEnvelope) -> Result<LedgerReceipt, LedgerError> {
        let envelope = tx.to_xdr_base64(Limits::none())?;
        let sent: SendTransaction = self
            .call("sendTransaction", json!({ "transaction": envelope }))
            .await?;

        let SendTransaction {
            status,
            hash,
            error_result_xdr,
        } = sent;
        match hash {
            Some(hash) if status == "PENDING" || status == "DUPLICATE" => {
                tracing::info!(hash = %hash, status = %status, "Transaction sent");
                self.poll(&hash).await
            }
            hash => {
                tracing::warn!(status = %status, "Transaction rejected by RPC");
                Err(LedgerError::Rejected {
                    status,
                    hash,
                    error_result_xdr,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::contract::extend_ttl_call;
    use crate::relay::testing::serve_sequence;
    use crate::strkey::ContractId;
    use crate::tx::Draft;

    fn rpc_result(result: Value) -> (&'static str, String) {
        ("200 OK", json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
    }

    fn envelope() -> TransactionEnvelope {
        let op = extend_ttl_call(&ContractId([0x11; 32])).unwrap();
        let tx = Draft::from_operation(&AccountKey([0x22; 32]), 7, 100, 0, op)
            .unwrap()
            .into_transaction();
        unsigned_envelope(&tx)
    }

    fn client(url: &str) -> StellarRpcClient {
        StellarRpcClient::new(url, url).with_polling(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn pending_submission_is_polled_to_success() {
        let (url, server) = serve_sequence(vec![
            rpc_result(json!({ "status": "PENDING", "hash": "abc" })),
            rpc_result(json!({ "status": "NOT_FOUND" })),
            rpc_result(json!({ "status": "SUCCESS", "ledger": 77, "resultXdr": "AAAA" })),
        ])
        .await;

        let receipt = client(&url).submit(&envelope()).await.unwrap();
        assert_eq!(
            receipt,
            LedgerReceipt {
                hash: "abc".to_string(),
                status: "SUCCESS".to_string(),
                ledger: Some(77),
                result_xdr: Some("AAAA".to_string()),
            }
        );

        let requests = server.await.unwrap();
        assert!(requests[0].contains("\"sendTransaction\""));
        assert!(requests[1].contains("\"getTransaction\""));
        assert!(requests[2].contains("\"abc\""));
    }

    #[tokio::test]
    async fn failed_transaction_is_reported() {
        let (url, server) = serve_sequence(vec![
            rpc_result(json!({ "status": "DUPLICATE", "hash": "abc" })),
            rpc_result(json!({ "status": "FAILED", "resultXdr": "AAAB" })),
        ])
        .await;

        let err = client(&url).submit(&envelope()).await.unwrap_err();
        match err {
            LedgerError::Failed { hash, result_xdr } => {
                assert_eq!(hash, "abc");
                assert_eq!(result_xdr.as_deref(), Some("AAAB"));
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn error_status_is_rejected_without_polling() {
        let (url, server) = serve_sequence(vec![rpc_result(json!({
            "status": "ERROR",
            "hash": "abc",
            "errorResultXdr": "AAAAAAAAAGT////7AAAAAA=="
        }))])
        .await;

        let err = client(&url).submit(&envelope()).await.unwrap_err();
        match err {
            LedgerError::Rejected {
                status,
                hash,
                error_result_xdr,
            } => {
                assert_eq!(status, "ERROR");
                assert_eq!(hash.as_deref(), Some("abc"));
                assert!(error_result_xdr.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unconfirmed_after_all_polls() {
        let (url, server) = serve_sequence(vec![
            rpc_result(json!({ "status": "PENDING", "hash": "abc" })),
            rpc_result(json!({ "status": "NOT_FOUND" })),
            rpc_result(json!({ "status": "NOT_FOUND" })),
        ])
        .await;

        let client = StellarRpcClient::new(&url, &url).with_polling(2, Duration::from_millis(1));
        let err = client.submit(&envelope()).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotConfirmed { attempts: 2, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn rpc_error_object_is_mapped() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "invalid parameters" }
        });
        let (url, server) = serve_sequence(vec![("200 OK", body.to_string())]).await;

        let err = client(&url).latest_ledger().await.unwrap_err();
        match err {
            LedgerError::Rpc { code, message } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "invalid parameters");
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn reads_latest_ledger() {
        let (url, server) = serve_sequence(vec![rpc_result(json!({
            "id": "e1a3",
            "protocolVersion": 22,
            "sequence": 1234
        }))])
        .await;

        assert_eq!(client(&url).latest_ledger().await.unwrap(), 1234);
        let requests = server.await.unwrap();
        assert!(requests[0].contains("\"getLatestLedger\""));
    }

    #[tokio::test]
    async fn account_sequence_comes_from_horizon() {
        let account = AccountKey([0x22; 32]);
        let (url, server) = serve_sequence(vec![
            ("200 OK", json!({ "sequence": "4294967296" }).to_string()),
            ("404 Not Found", json!({ "status": 404 }).to_string()),
        ])
        .await;
        let client = client(&url);

        assert_eq!(client.account_sequence(&account).await.unwrap(), 4_294_967_296);
        let err = client.account_sequence(&account).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(ref id) if *id == account.to_string()));

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with(&format!("GET /accounts/{} ", account)));
    }

    #[test]
    fn builds_from_config() {
        let config = NetworkConfig::for_network(
            Network::Testnet,
            "CAE432Y727GMA7NSINQHFTENA22N7S3F4XUQZFQCZNDP74OFX4DZET24",
        );
        let client = StellarRpcClient::from_config(&config);
        assert_eq!(client.rpc_url, "https://soroban-testnet.stellar.org");
        assert_eq!(client.poll_attempts, 20);
    }

    #[test]
    fn polling_needs_at_least_one_attempt() {
        let client = StellarRpcClient::new("http://localhost:8000", "http://localhost:8001")
            .with_polling(0, Duration::from_millis(1));
        assert_eq!(client.poll_attempts, 1);
    }
}
