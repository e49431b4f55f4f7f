use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use spend_executor::{
    serve, ChainArgs, EthersChain, ExecutorConfig, RedemptionExecutor, ServeArgs,
};
use spend_permission_client::Erc20AllowanceReader;
use spend_permission_encoder::{PermissionDomain, TypedDataRequest};
use spend_permission_types::{AllowanceProvider, ChainWriter, WirePermission, USDC_ADDRESS};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Redeem signed spend permissions: `approveWithSignature` followed by `spend`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Log filter, used when RUST_LOG is unset (eg, info, spend_executor=debug).
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP endpoint (`POST /spend`).
    Serve(ServeArgs),

    /// Print the EIP-712 digest and wallet request for a permission JSON file.
    Digest {
        /// Permission in wire form (camelCase keys, integers as decimal strings).
        path: PathBuf,

        #[arg(long, env = "CHAIN_ID", default_value_t = spend_permission_types::DEFAULT_CHAIN_ID)]
        chain_id: u64,

        #[arg(long, env = "SPEND_PERMISSION_MANAGER", default_value_t = spend_permission_types::SPEND_PERMISSION_MANAGER)]
        manager: Address,
    },

    /// Query an owner's ERC-20 allowance to the manager.
    Allowance {
        #[command(flatten)]
        chain: ChainArgs,

        #[arg(long)]
        owner: Address,

        #[arg(long, default_value_t = USDC_ADDRESS)]
        token: Address,
    },
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Digest {
            path,
            chain_id,
            manager,
        } => print_digest(&path, PermissionDomain::new(chain_id, manager)),
        Command::Allowance {
            chain,
            owner,
            token,
        } => print_allowance(&chain, owner, token).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = Arc::new(ExecutorConfig::from_cli(&args).context("invalid executor configuration")?);

    let writer: Option<Arc<dyn ChainWriter>> = match &config.credential {
        Some(credential) => {
            let chain = EthersChain::connect(&config.rpc_url, config.chain_id, Some(credential))
                .map_err(|e| anyhow!("failed to connect to {}: {e}", config.rpc_url))?;
            info!(executor = %credential.address(), chain_id = config.chain_id, "signing credential loaded");
            let chain: Arc<dyn ChainWriter> = Arc::new(chain);
            Some(chain)
        }
        None => {
            warn!("no private key configured; every redemption will fail");
            None
        }
    };

    let executor = Arc::new(RedemptionExecutor::new(config, writer));
    serve(executor, args.listen).await
}

fn print_digest(path: &Path, domain: PermissionDomain) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    let wire: WirePermission = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing {}", path.display()))?;
    let permission = wire.into_permission().context("invalid permission")?;

    let request = TypedDataRequest::new(domain, permission);
    let digest = request.digest().context("permission does not encode")?;
    println!("digest: {digest}");
    println!("{}", serde_json::to_string_pretty(&request.to_json())?);
    Ok(())
}

async fn print_allowance(chain: &ChainArgs, owner: Address, token: Address) -> Result<()> {
    let reader = EthersChain::connect(&chain.rpc_url, chain.chain_id, None)
        .map_err(|e| anyhow!("failed to connect to {}: {e}", chain.rpc_url))?;
    let allowance = Erc20AllowanceReader::new(reader)
        .allowance(owner, chain.manager, token)
        .await
        .map_err(|e| anyhow!("allowance query failed: {e}"))?;
    println!("{allowance}");
    Ok(())
}
