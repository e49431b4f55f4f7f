//! JSON-RPC chain access through ethers.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Bytes as EthBytes, Eip1559TransactionRequest,
        TransactionRequest, H160, H256, U64,
    },
};
use spend_permission_types::{ChainError, ChainReader, ChainWriter, ContractCall};

use crate::config::SigningCredential;

type SigningClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct EthersChain {
    provider: Provider<Http>,
    client: Option<SigningClient>,
}

fn to_h160(address: Address) -> H160 {
    H160::from_slice(address.as_slice())
}

fn to_h256(hash: B256) -> H256 {
    H256::from_slice(hash.as_slice())
}

fn from_h256(hash: H256) -> B256 {
    B256::from_slice(hash.as_bytes())
}

impl EthersChain {
    /// Read-only unless a credential is given.
    pub fn connect(
        rpc_url: &str,
        chain_id: u64,
        credential: Option<&SigningCredential>,
    ) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ChainError::Transport(format!("invalid rpc url {rpc_url}: {e}")))?;
        let client = match credential {
            Some(credential) => {
                let wallet = LocalWallet::from_bytes(credential.key().to_bytes().as_slice())
                    .map_err(|e| ChainError::Transport(e.to_string()))?
                    .with_chain_id(chain_id);
                Some(SignerMiddleware::new(provider.clone(), wallet))
            }
            None => None,
        };
        Ok(Self { provider, client })
    }

    fn client(&self) -> Result<&SigningClient, ChainError> {
        self.client
            .as_ref()
            .ok_or_else(|| ChainError::Rejected("no signing credential configured".to_string()))
    }
}

#[async_trait]
impl ChainReader for EthersChain {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(to_h160(to))
            .data(EthBytes::from(data.to_vec()))
            .into();
        let out = self
            .provider
            .call(&tx, None)
            .await
            .map_err(|e| ChainError::Rejected(e.to_string()))?;
        Ok(Bytes::from(out.to_vec()))
    }
}

#[async_trait]
impl ChainWriter for EthersChain {
    async fn submit(&self, call: ContractCall) -> Result<B256, ChainError> {
        let client = self.client()?;
        let tx = Eip1559TransactionRequest::new()
            .to(to_h160(call.to))
            .data(EthBytes::from(call.data.to_vec()));
        let pending = client
            .send_transaction(tx, None)
            .await
            .map_err(|e| ChainError::Rejected(format!("{}: {e}", call.function)))?;
        let hash = from_h256(pending.tx_hash());
        tracing::debug!(function = call.function, to = %call.to, tx = %hash, "transaction sent");
        Ok(hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: B256,
        confirmations: usize,
    ) -> Result<(), ChainError> {
        let receipt = PendingTransaction::new(to_h256(tx_hash), &self.provider)
            .confirmations(confirmations)
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        match receipt {
            None => Err(ChainError::Dropped(tx_hash)),
            Some(receipt) if receipt.status == Some(U64::zero()) => {
                Err(ChainError::Reverted(tx_hash))
            }
            Some(_) => Ok(()),
        }
    }
}
