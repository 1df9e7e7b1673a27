//! End-to-end transaction flow for one smart account
//!
//! Every stage produces a new value: a [`Draft`] is simulated into a
//! [`Simulated`], assembled into an [`Assembled`], signed by the sponsor into
//! a [`Signed`], then submitted to the ledger or the relay.

use std::sync::Arc;

use alloy::hex;
use serde_json::Value;
use stellar_xdr::curr::{Hash, Limits, Operation, ScAddress, Transaction, TransactionEnvelope, WriteXdr};

use super::{assemble, transaction_hash, Draft, OperationKind, SponsorKey, TxError};
use crate::account::PublicKeyVariant;
use crate::auth::{AuthorizationBridge, BridgeError};
use crate::config::{Config, NetworkConfig};
use crate::contract::{extend_ttl_call, init_call, transfer_call};
use crate::ledger::{LedgerReceipt, LedgerRpc, SimulationSuccess};
use crate::relay::RelayClient;
use crate::strkey::{AccountKey, ContractId};
use crate::{Error, Result};

/// Where a signed envelope goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRoute {
    /// Straight to the RPC node, paid by the sponsor
    Ledger,
    /// Through the fee-sponsoring relay with a fee bid in stroops
    Relay { fee: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submitted {
    Ledger(LedgerReceipt),
    Relay(Value),
}

/// A draft at the base fee and the simulation run against it
#[derive(Debug, Clone)]
pub struct Simulated {
    draft: Draft,
    simulation: SimulationSuccess,
}

impl Simulated {
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn simulation(&self) -> &SimulationSuccess {
        &self.simulation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    tx: Transaction,
}

impl Assembled {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn fee(&self) -> u32 {
        self.tx.fee
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signed {
    envelope: TransactionEnvelope,
    hash: [u8; 32],
}

impl Signed {
    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn to_xdr_base64(&self) -> Result<String> {
        Ok(self.envelope.to_xdr_base64(Limits::none())?)
    }
}

/// Drives transactions for one smart account from build to final status
///
/// The sponsor is the source account of every transaction and pays its fees;
/// the bridge signs only the authorization entries addressed to the account.
pub struct TransactionWorkflow {
    /// RPC boundary for heights, sequences, simulation and submission
    ledger: Arc<dyn LedgerRpc>,
    /// Base fee, timeout and passphrase
    network: NetworkConfig,
    /// Cached hash of the passphrase
    network_id: Hash,
    /// External signer plus the account it authorizes for
    bridge: AuthorizationBridge,
    /// Source account key
    sponsor: SponsorKey,
    /// Set when `SubmitRoute::Relay` is available
    relay: Option<RelayClient>,
}

impl TransactionWorkflow {
    /// Create a workflow without a relay
    ///
    /// # Arguments
    /// * `network` - Fee, timeout and passphrase settings
    /// * `ledger` - RPC boundary; a scripted implementation works for tests
    /// * `bridge` - Signs auth entries for the account; may lack a signer
    ///   when only sponsor-authorized calls (`init`, `fund`) are made
    /// * `sponsor` - Source account that pays fees
    pub fn new(
        network: NetworkConfig,
        ledger: Arc<dyn LedgerRpc>,
        bridge: AuthorizationBridge,
        sponsor: SponsorKey,
    ) -> Self {
        Self {
            network_id: network.network_id(),
            ledger,
            network,
            bridge,
            sponsor,
            relay: None,
        }
    }

    /// Create a workflow from a loaded [`Config`]
    ///
    /// The relay comes from `config.relay` when present.
    pub fn from_config(
        config: &Config,
        ledger: Arc<dyn LedgerRpc>,
        bridge: AuthorizationBridge,
        sponsor: SponsorKey,
    ) -> Self {
        let workflow = Self::new(config.network.clone(), ledger, bridge, sponsor);
        match &config.relay {
            Some(relay) => workflow.with_relay(RelayClient::from_config(relay)),
            None => workflow,
        }
    }

    /// Enable `SubmitRoute::Relay`
    pub fn with_relay(mut self, relay: RelayClient) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn bridge(&self) -> &AuthorizationBridge {
        &self.bridge
    }

    pub fn contract(&self) -> &ContractId {
        self.bridge.contract()
    }

    pub fn sponsor(&self) -> &AccountKey {
        self.sponsor.account()
    }

    /// Wrap `op` in a transaction at the sponsor's next sequence number
    pub async fn begin(&self, op: Operation) -> Result<Draft> {
        let sequence = self.ledger.account_sequence(self.sponsor.account()).await?;
        tracing::debug!(source = %self.sponsor.account(), sequence, "Building transaction");
        Ok(Draft::from_operation(
            self.sponsor.account(),
            sequence,
            self.network.base_fee,
            self.network.tx_timeout_secs,
            op,
        )?)
    }

    /// Simulate at the base fee, whatever fee `draft` carries
    pub async fn simulate(&self, draft: &Draft) -> Result<Simulated> {
        let draft = draft.reset_fee(self.network.base_fee);
        let response = self.ledger.simulate(draft.transaction()).await?;
        let simulation = response.into_outcome().map_err(|e| {
            tracing::warn!(error = %e, "Simulation failed");
            e
        })?;
        tracing::debug!(
            min_resource_fee = simulation.min_resource_fee,
            auth_entries = simulation.auth.len(),
            latest_ledger = simulation.latest_ledger,
            "Simulation succeeded"
        );
        Ok(Simulated { draft, simulation })
    }

    pub fn assemble(&self, simulated: &Simulated) -> Result<Assembled> {
        let tx = assemble(simulated.draft.transaction(), &simulated.simulation)?;
        Ok(Assembled { tx })
    }

    /// Authorize `tx` for this account, then re-simulate and assemble it
    ///
    /// `tx` must hold exactly one invoke, TTL-extension or restore operation.
    /// Auth entries naming this account are signed by the external signer;
    /// the simulation then runs against the signed entries so `__check_auth`
    /// is included in the resource estimate.
    pub async fn sign_transaction(&self, tx: Transaction) -> Result<Assembled> {
        if !self.bridge.is_configured() {
            return Err(BridgeError::SignerNotConfigured.into());
        }
        let draft = Draft::new(tx)?.reset_fee(self.network.base_fee);

        let draft = if draft.kind() == OperationKind::InvokeHostFunction {
            let signed = self
                .bridge
                .sign_auth_entries(self.ledger.as_ref(), draft.auth_entries())
                .await?;
            draft.with_auth(signed)?
        } else {
            draft
        };

        let simulated = self.simulate(&draft).await?;
        self.assemble(&simulated)
    }

    /// Build, simulate and assemble `op`, signing auth only if the
    /// simulation asks this account for it
    pub async fn prepare(&self, op: Operation) -> Result<Assembled> {
        let draft = self.begin(op).await?;
        let simulated = self.simulate(&draft).await?;

        let needs_signature = simulated
            .simulation
            .auth
            .iter()
            .any(|entry| self.bridge.targets(entry));
        if !needs_signature {
            return self.assemble(&simulated);
        }

        let draft = simulated
            .draft
            .with_auth(simulated.simulation.auth.clone())?;
        self.sign_transaction(draft.into_transaction()).await
    }

    /// Sponsor signature over the assembled transaction
    pub fn sign(&self, assembled: &Assembled) -> Result<Signed> {
        let envelope = self.sponsor.sign(&assembled.tx, &self.network_id)?;
        let hash = transaction_hash(&assembled.tx, &self.network_id)?;
        Ok(Signed { envelope, hash })
    }

    /// Send a signed envelope along `route`
    ///
    /// Relay errors are returned with the relay's body untouched.
    pub async fn submit(&self, signed: &Signed, route: SubmitRoute) -> Result<Submitted> {
        match route {
            SubmitRoute::Ledger => {
                let receipt = self.ledger.submit(&signed.envelope).await?;
                Ok(Submitted::Ledger(receipt))
            }
            SubmitRoute::Relay { fee } => {
                let relay = self.relay.as_ref().ok_or(Error::RelayNotConfigured)?;
                let body = relay.submit(&signed.to_xdr_base64()?, fee).await?;
                Ok(Submitted::Relay(body))
            }
        }
    }

    /// Prepare, sign and submit a single operation
    pub async fn execute(&self, op: Operation, route: SubmitRoute) -> Result<Submitted> {
        if matches!(route, SubmitRoute::Relay { .. }) && self.relay.is_none() {
            return Err(Error::RelayNotConfigured);
        }

        let assembled = self.prepare(op).await?;
        let signed = self.sign(&assembled)?;
        tracing::info!(
            hash = %signed.hash_hex(),
            fee = assembled.fee(),
            route = ?route,
            "Submitting transaction"
        );
        self.submit(&signed, route).await
    }

    /// Register the account's first signer; paid for by the sponsor
    pub async fn init(&self, signer: &PublicKeyVariant, route: SubmitRoute) -> Result<Submitted> {
        tracing::info!(
            contract = %self.contract(),
            signer_kind = %signer.kind(),
            signer = %hex::encode(signer.as_bytes()),
            "Initializing smart account"
        );
        let op = init_call(self.contract(), signer)?;
        self.execute(op, route).await
    }

    /// Keep the account's instance storage from being archived
    pub async fn extend_ttl(&self, route: SubmitRoute) -> Result<Submitted> {
        let op = extend_ttl_call(self.contract())?;
        self.execute(op, route).await
    }

    /// Move `amount` of `token` out of the smart account
    ///
    /// # Arguments
    /// * `token` - Token contract, e.g. the native XLM asset contract
    /// * `to` - Recipient account or contract
    /// * `amount` - Smallest token units (stroops for XLM); must not be negative
    ///
    /// The account authorizes the debit, so this needs an external signer.
    pub async fn transfer(
        &self,
        token: &ContractId,
        to: &ScAddress,
        amount: i128,
        route: SubmitRoute,
    ) -> Result<Submitted> {
        if amount < 0 {
            return Err(TxError::InvalidAmount(amount.to_string()).into());
        }
        tracing::info!(token = %token, amount = %amount, "Transferring from smart account");
        let op = transfer_call(token, &self.contract().sc_address(), to, amount)?;
        self.execute(op, route).await
    }

    /// Pay `amount` of `token` from the sponsor into the smart account
    ///
    /// The sponsor is the transaction source, so the simulation hands back
    /// source-account credentials and the external signer is never asked.
    pub async fn fund(
        &self,
        token: &ContractId,
        amount: i128,
        route: SubmitRoute,
    ) -> Result<Submitted> {
        if amount < 0 {
            return Err(TxError::InvalidAmount(amount.to_string()).into());
        }
        tracing::info!(
            token = %token,
            amount = %amount,
            sponsor = %self.sponsor.account(),
            "Funding smart account"
        );
        let op = transfer_call(
            token,
            &self.sponsor.account().sc_address(),
            &self.contract().sc_address(),
            amount,
        )?;
        self.execute(op, route).await
    }
}

impl std::fmt::Debug for TransactionWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionWorkflow")
            .field("network", &self.network.passphrase)
            .field("bridge", &self.bridge)
            .field("sponsor", &self.sponsor)
            .field("relay", &self.relay)
            .finish()
    }
}
