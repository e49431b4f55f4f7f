//! Redemption executor for signed spend permissions.

pub mod chain;
pub mod config;
pub mod error;
pub mod executor;
pub mod inflight;
pub mod server;


pub use chain::EthersChain;
pub use config::{ChainArgs, ConfigError, ExecutorConfig, ServeArgs, SigningCredential};
pub use error::RedeemError;
pub use executor::{reconstruct, RedemptionExecutor, SpendRequest, SpendResponse};
pub use inflight::{InFlight, InFlightGuard};
pub use server::{handle_spend, router, serve};
