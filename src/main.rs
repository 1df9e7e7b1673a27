//! Omniwallet CLI
//!
//! Command-line interface for driving a Soroban smart account with an Ethereum key.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::hex;
use clap::{Args, Parser, Subcommand};
use omniwallet::auth::{authorization_preimage, AuthorizationDigest};
use omniwallet::config::env::vars;
use omniwallet::relay::DEFAULT_RELAY_FEE;
use omniwallet::strkey::{parse_address, ContractId};
use omniwallet::tx::xlm_to_stroops;
use omniwallet::{
    AuthorizationBridge, Config, Error, LocalEthereumSigner, PublicKeyVariant, Result, SponsorKey,
    StellarRpcClient, SubmitRoute, Submitted, TransactionWorkflow, VariantKind,
};
use stellar_xdr::curr::{Limits, ReadXdr, SorobanAuthorizedInvocation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "omniwallet")]
#[command(about = "Ethereum-key authorization for Stellar smart accounts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (JSON); defaults to OMNIWALLET_* environment variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct SubmitArgs {
    /// Submit through the fee-sponsoring relay instead of the RPC node
    #[arg(long)]
    relay: bool,

    /// Relay fee bid in stroops
    #[arg(long, default_value_t = DEFAULT_RELAY_FEE, requires = "relay")]
    fee: u64,
}

impl SubmitArgs {
    fn route(&self) -> SubmitRoute {
        if self.relay {
            SubmitRoute::Relay { fee: self.fee }
        } else {
            SubmitRoute::Ledger
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Config,

    /// Register the smart account's first signer
    Init {
        /// Signer key, hex (20-byte address, 32-byte ed25519 or 65-byte uncompressed secp256k1)
        #[arg(long)]
        signer: String,

        #[command(flatten)]
        submit: SubmitArgs,
    },

    /// Transfer tokens out of the smart account, authorized by ETH_PRIVATE_KEY
    Transfer {
        /// Token contract (C...)
        #[arg(long)]
        token: String,

        /// Recipient account or contract (G... or C...)
        #[arg(long)]
        to: String,

        /// Amount in XLM units (7 decimals)
        #[arg(long)]
        amount: String,

        #[command(flatten)]
        submit: SubmitArgs,
    },

    /// Pay tokens from the sponsor account into the smart account
    Fund {
        /// Token contract (C...), e.g. the network's native XLM asset contract
        #[arg(long)]
        token: String,

        /// Amount in XLM units (7 decimals)
        #[arg(long)]
        amount: String,

        #[command(flatten)]
        submit: SubmitArgs,
    },

    /// Extend the smart account's storage TTL
    ExtendTtl {
        #[command(flatten)]
        submit: SubmitArgs,
    },

    /// Print the hashes an authorization entry is signed over
    Digest {
        /// Credential nonce
        #[arg(long)]
        nonce: i64,

        /// Signature expiration ledger
        #[arg(long)]
        expiration: u32,

        /// Base64 SorobanAuthorizedInvocation
        #[arg(long)]
        invocation: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Init { signer, submit } => {
            run_init(&config, &signer, submit.route()).await?;
        }
        Commands::Transfer {
            token,
            to,
            amount,
            submit,
        } => {
            run_transfer(&config, &token, &to, &amount, submit.route()).await?;
        }
        Commands::Fund {
            token,
            amount,
            submit,
        } => {
            let token: ContractId = token.parse()?;
            let amount = xlm_to_stroops(&amount)?;
            let workflow = build_workflow(&config, false)?;
            print_submitted(&workflow.fund(&token, amount, submit.route()).await?)?;
        }
        Commands::ExtendTtl { submit } => {
            let workflow = build_workflow(&config, false)?;
            print_submitted(&workflow.extend_ttl(submit.route()).await?)?;
        }
        Commands::Digest {
            nonce,
            expiration,
            invocation,
        } => {
            run_digest(&config, nonce, expiration, &invocation)?;
        }
    }

    Ok(())
}

/// Wire the workflow from config and the process environment
///
/// The Ethereum key is only loaded when the command needs authorization.
fn build_workflow(config: &Config, with_signer: bool) -> Result<TransactionWorkflow> {
    let sponsor = SponsorKey::from_env(vars::SPONSOR_SECRET)?;
    tracing::info!(sponsor = %sponsor.account(), "Loaded sponsor account");

    let mut bridge = AuthorizationBridge::from_config(&config.network)?;
    if with_signer {
        let signer = LocalEthereumSigner::from_env(vars::ETH_PRIVATE_KEY)?;
        tracing::info!(address = %signer.address(), "Loaded Ethereum signer");
        bridge = bridge.with_signer(Arc::new(signer));
    }

    let ledger = Arc::new(StellarRpcClient::from_config(&config.network));
    Ok(TransactionWorkflow::from_config(config, ledger, bridge, sponsor))
}

async fn run_init(config: &Config, signer: &str, route: SubmitRoute) -> Result<()> {
    let bytes = hex::decode(signer.trim_start_matches("0x"))
        .map_err(|e| Error::InvalidArgument(format!("signer is not hex: {}", e)))?;
    let kind = VariantKind::from_key_len(bytes.len()).ok_or_else(|| {
        Error::InvalidArgument(format!("no signer variant is {} bytes long", bytes.len()))
    })?;
    let signer = PublicKeyVariant::from_slice(kind, &bytes)?;

    let workflow = build_workflow(config, false)?;
    let submitted = workflow.init(&signer, route).await.map_err(|e| {
        if let Some(code) = e.contract_error() {
            tracing::warn!(code = code.code(), error = %code, "Account contract refused init");
        }
        e
    })?;
    print_submitted(&submitted)
}

async fn run_transfer(
    config: &Config,
    token: &str,
    to: &str,
    amount: &str,
    route: SubmitRoute,
) -> Result<()> {
    let token: ContractId = token.parse()?;
    let to = parse_address(to)?;
    let amount = xlm_to_stroops(amount)?;

    let workflow = build_workflow(config, true)?;
    let submitted = workflow.transfer(&token, &to, amount, route).await?;
    print_submitted(&submitted)
}

fn run_digest(config: &Config, nonce: i64, expiration: u32, invocation: &str) -> Result<()> {
    let invocation = SorobanAuthorizedInvocation::from_xdr_base64(invocation, Limits::none())?;
    let preimage = authorization_preimage(&config.network.network_id(), nonce, expiration, &invocation);
    let digest = AuthorizationDigest::from_preimage(&preimage)?;

    println!("payload: {}", hex::encode(digest.payload));
    println!("message: {}", digest.message);
    println!("digest:  {}", digest.digest);
    Ok(())
}

fn print_submitted(submitted: &Submitted) -> Result<()> {
    let output = match submitted {
        Submitted::Ledger(receipt) => serde_json::to_string_pretty(receipt)?,
        Submitted::Relay(body) => serde_json::to_string_pretty(body)?,
    };
    println!("{}", output);
    Ok(())
}
