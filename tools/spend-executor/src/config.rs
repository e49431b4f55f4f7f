use std::{fmt, fs, net::SocketAddr, path::PathBuf, time::Duration};

use alloy_primitives::{Address, U256};
use clap::Args;
use k256::ecdsa::SigningKey;
use spend_permission_encoder::{address_of, PermissionDomain};
use spend_permission_types::{DEFAULT_CHAIN_ID, SPEND_PERMISSION_MANAGER};
use thiserror::Error;

pub const DEFAULT_RPC_URL: &str = "https://sepolia.base.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("private key is not a valid secp256k1 scalar: {0}")]
    InvalidKey(String),
    #[error("failed reading private key from {path}: {source}")]
    ReadKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Chain connection flags shared by every subcommand that talks to a node.
#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    /// JSON-RPC endpoint.
    #[arg(long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    #[arg(long, env = "CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: u64,

    /// Spend permission manager (EIP-712 verifying contract).
    #[arg(long, env = "SPEND_PERMISSION_MANAGER", default_value_t = SPEND_PERMISSION_MANAGER)]
    pub manager: Address,
}

/// Flags for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub chain: ChainArgs,

    /// Executor private key (hex string, 0x...).
    #[arg(long, env = "PRIVATE_KEY", conflicts_with = "private_key_path")]
    pub private_key: Option<String>,

    /// Path to a file containing the executor private key.
    #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "private_key")]
    pub private_key_path: Option<PathBuf>,

    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Quantity pulled by each `spend`, in the token's smallest unit.
    #[arg(long, default_value_t = 1)]
    pub spend_value: u64,

    /// Confirmations to wait for on `approveWithSignature` before spending (0 skips the wait).
    #[arg(long, default_value_t = 1)]
    pub confirmations: usize,

    /// Extra pause between the approval and the spend.
    #[arg(long, default_value_t = 1000)]
    pub settle_delay_ms: u64,
}

/// The executor's signing identity. Never printed.
#[derive(Clone)]
pub struct SigningCredential {
    key: SigningKey,
    address: Address,
}

impl SigningCredential {
    pub fn from_hex(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
        let key =
            SigningKey::from_slice(&bytes).map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
        Ok(Self::from_key(key))
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::ReadKey {
            path: path.clone(),
            source,
        })?;
        Self::from_hex(&contents)
    }

    pub fn from_key(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn key(&self) -> &SigningKey {
        &self.key
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("address", &self.address)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Immutable executor settings, loaded once at startup.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub manager: Address,
    pub credential: Option<SigningCredential>,
    pub spend_value: U256,
    pub confirmations: usize,
    pub settle_delay: Duration,
}

impl ExecutorConfig {
    /// A missing key is not an error here: the server still starts and every
    /// redemption reports the missing configuration.
    pub fn from_cli(args: &ServeArgs) -> Result<Self, ConfigError> {
        let credential = match (&args.private_key, &args.private_key_path) {
            (Some(hex), _) => Some(SigningCredential::from_hex(hex)?),
            (None, Some(path)) => Some(SigningCredential::from_file(path)?),
            (None, None) => None,
        };
        Ok(Self {
            rpc_url: args.chain.rpc_url.clone(),
            chain_id: args.chain.chain_id,
            manager: args.chain.manager,
            credential,
            spend_value: U256::from(args.spend_value),
            confirmations: args.confirmations,
            settle_delay: Duration::from_millis(args.settle_delay_ms),
        })
    }

    pub fn domain(&self) -> PermissionDomain {
        PermissionDomain::new(self.chain_id, self.manager)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            manager: SPEND_PERMISSION_MANAGER,
            credential: None,
            spend_value: U256::from(1u64),
            confirmations: 1,
            settle_delay: Duration::from_millis(1000),
        }
    }
}
