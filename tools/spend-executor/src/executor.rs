//! Redemption: `approveWithSignature`, wait, `spend`, strictly in that order.

use std::sync::Arc;

use alloy_primitives::{Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spend_permission_client::{RedemptionFailure, Redeemer};
use spend_permission_encoder::{
    abi::{approve_with_signature_calldata, spend_calldata, APPROVE_WITH_SIGNATURE, SPEND},
    permission_digest,
};
use spend_permission_types::{
    wire::parse_signature, BalanceAbstraction, ChainWriter, ContractCall, RedemptionReceipt,
    SignedPermission, WirePermission,
};
use tracing::{info, warn};

use crate::{config::ExecutorConfig, error::RedeemError, inflight::InFlight};

/// `POST /spend` body. Fields are untyped so absent or falsy values map to the missing-fields 400.
#[derive(Debug, Default, Deserialize)]
pub struct SpendRequest {
    #[serde(default)]
    pub permission: Option<Value>,
    #[serde(default)]
    pub signature: Option<Value>,
}

/// `null`, `false`, `0` and `""` count as absent.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendResponse {
    pub success: bool,
    pub approve_tx_hash: B256,
    pub spend_tx_hash: B256,
}

impl From<RedemptionReceipt> for SpendResponse {
    fn from(receipt: RedemptionReceipt) -> Self {
        Self {
            success: true,
            approve_tx_hash: receipt.approve_tx_hash,
            spend_tx_hash: receipt.spend_tx_hash,
        }
    }
}

pub struct RedemptionExecutor {
    config: Arc<ExecutorConfig>,
    writer: Option<Arc<dyn ChainWriter>>,
    in_flight: InFlight,
}

impl RedemptionExecutor {
    /// `writer` is `None` when no signing credential is configured.
    pub fn new(config: Arc<ExecutorConfig>, writer: Option<Arc<dyn ChainWriter>>) -> Self {
        Self {
            config,
            writer,
            in_flight: InFlight::new(),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Validate and reconstruct an HTTP request, then redeem it.
    pub async fn redeem_request(
        &self,
        request: SpendRequest,
    ) -> Result<RedemptionReceipt, RedeemError> {
        let signed = reconstruct(request)?;
        self.redeem(&signed).await
    }

    pub async fn redeem(&self, signed: &SignedPermission) -> Result<RedemptionReceipt, RedeemError> {
        let writer = self.writer.as_ref().ok_or(RedeemError::NotConfigured)?;
        let permission = &signed.permission;

        // both calls are encoded before anything is submitted
        let digest = permission_digest(permission, &self.config.domain())
            .map_err(|e| RedeemError::InvalidRequest(e.to_string()))?;
        let approve = approve_with_signature_calldata(permission, &signed.signature)
            .map_err(|e| RedeemError::InvalidRequest(e.to_string()))?;
        let spend = spend_calldata(permission, self.config.spend_value, &Bytes::new())
            .map_err(|e| RedeemError::InvalidRequest(e.to_string()))?;

        let _guard = self.in_flight.acquire(digest).ok_or_else(|| {
            warn!(%digest, "redemption already in progress");
            RedeemError::InProgress
        })?;

        info!(
            %digest,
            account = %permission.account,
            spender = %permission.spender,
            token = %permission.token,
            balance_abstraction = ?BalanceAbstraction::from_extra_data(&permission.extra_data),
            "redeeming spend permission"
        );

        let approve_tx_hash = writer
            .submit(ContractCall {
                to: self.config.manager,
                function: APPROVE_WITH_SIGNATURE,
                data: approve,
            })
            .await
            .map_err(|source| chain_failure(APPROVE_WITH_SIGNATURE, source))?;
        info!(approve_tx = %approve_tx_hash, "approveWithSignature submitted");

        if self.config.confirmations > 0 {
            writer
                .wait_for_confirmation(approve_tx_hash, self.config.confirmations)
                .await
                .map_err(|source| chain_failure(APPROVE_WITH_SIGNATURE, source))?;
            info!(
                approve_tx = %approve_tx_hash,
                confirmations = self.config.confirmations,
                "approveWithSignature confirmed"
            );
        }

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let spend_tx_hash = writer
            .submit(ContractCall {
                to: self.config.manager,
                function: SPEND,
                data: spend,
            })
            .await
            .map_err(|source| chain_failure(SPEND, source))?;
        info!(
            approve_tx = %approve_tx_hash,
            spend_tx = %spend_tx_hash,
            value = %self.config.spend_value,
            "spend submitted"
        );

        Ok(RedemptionReceipt {
            approve_tx_hash,
            spend_tx_hash,
        })
    }
}

fn chain_failure(step: &'static str, source: spend_permission_types::ChainError) -> RedeemError {
    warn!(step, error = %source, "redemption step failed");
    RedeemError::Chain { step, source }
}

/// Required-field check, wire decoding and permission validation. Nothing here touches the chain.
pub fn reconstruct(request: SpendRequest) -> Result<SignedPermission, RedeemError> {
    let (permission, signature) = match (request.permission, request.signature) {
        (Some(permission), Some(signature)) if !is_falsy(&permission) && !is_falsy(&signature) => {
            (permission, signature)
        }
        _ => return Err(RedeemError::MissingFields),
    };

    let wire: WirePermission = serde_json::from_value(permission)
        .map_err(|e| RedeemError::InvalidRequest(format!("permission: {e}")))?;
    let permission = wire
        .into_permission()
        .map_err(|e| RedeemError::InvalidRequest(e.to_string()))?;
    permission
        .validate()
        .map_err(|e| RedeemError::InvalidRequest(e.to_string()))?;

    let signature = signature.as_str().ok_or_else(|| {
        RedeemError::InvalidRequest("signature must be a hex string".to_string())
    })?;
    let signature =
        parse_signature(signature).map_err(|e| RedeemError::InvalidRequest(e.to_string()))?;

    Ok(SignedPermission {
        permission,
        signature,
    })
}

#[async_trait]
impl Redeemer for RedemptionExecutor {
    async fn redeem(
        &self,
        signed: &SignedPermission,
    ) -> Result<RedemptionReceipt, RedemptionFailure> {
        RedemptionExecutor::redeem(self, signed)
            .await
            .map_err(RedemptionFailure::from)
    }
}
