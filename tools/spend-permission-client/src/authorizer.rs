//! Drives a [`Session`] through its side effects: signing, the allowance preflight,
//! the owner's token approval and the hand-off to the redemption executor.
//!
//! Every step is triggered explicitly by the caller. Nothing is retried on its own.

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use spend_permission_encoder::{
    abi::{erc20_approve_max_calldata, ERC20_APPROVE},
    PermissionDomain, TypedDataRequest,
};
use spend_permission_types::{
    AllowanceProvider, ChainWriter, ContractCall, RedemptionReceipt, SignedPermission,
    SpendPermission,
};

use crate::{
    builder::{AuthorizationForm, PermissionBuilder},
    error::{RedemptionFailure, SessionError, TransitionError},
    preflight::{approval_applies, Preflight},
    session::{ApprovalGate, Session, SessionEvent, SessionState},
    signing::TypedDataSigner,
};

/// The redemption service boundary.
#[async_trait]
pub trait Redeemer: Send + Sync {
    async fn redeem(&self, signed: &SignedPermission)
        -> Result<RedemptionReceipt, RedemptionFailure>;
}

pub struct Authorizer {
    builder: PermissionBuilder,
    domain: PermissionDomain,
    signer: Arc<dyn TypedDataSigner>,
    allowances: Arc<dyn AllowanceProvider>,
    wallet: Arc<dyn ChainWriter>,
    redeemer: Arc<dyn Redeemer>,
    session: Session,
}

impl Authorizer {
    pub fn new(
        builder: PermissionBuilder,
        domain: PermissionDomain,
        signer: Arc<dyn TypedDataSigner>,
        allowances: Arc<dyn AllowanceProvider>,
        wallet: Arc<dyn ChainWriter>,
        redeemer: Arc<dyn Redeemer>,
    ) -> Self {
        Self {
            builder,
            domain,
            signer,
            allowances,
            wallet,
            redeemer,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &SessionState {
        &self.session.state
    }

    /// The manager approvals are granted to (the domain's verifying contract).
    pub fn manager(&self) -> Address {
        self.domain.verifying_contract
    }

    fn advance(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let from = self.session.state.name();
        let next = self.session.clone().apply(event)?;
        tracing::debug!(from, to = next.state.name(), approval = ?next.approval, "session transition");
        self.session = next;
        Ok(())
    }

    fn current_permission(&self) -> Result<SpendPermission, SessionError> {
        self.session
            .state
            .permission()
            .cloned()
            .ok_or(SessionError::Transition(TransitionError {
                state: self.session.state.name(),
                event: "Preflight",
            }))
    }

    /// Build a permission from the form and, when an approval applies, run the preflight.
    pub async fn submit_form(
        &mut self,
        form: AuthorizationForm,
    ) -> Result<SpendPermission, SessionError> {
        let form = form.normalize(self.builder.capabilities);
        let permission = self.builder.build_now(&form)?;
        let applies = approval_applies(&permission, self.builder.capabilities.auxiliary_funds);
        self.advance(SessionEvent::Built {
            permission: permission.clone(),
            approval_applies: applies,
        })?;
        tracing::info!(
            account = %permission.account,
            token = %permission.token,
            allowance = %permission.allowance,
            "permission built"
        );
        if applies {
            self.check_approval().await?;
        }
        Ok(permission)
    }

    /// Ask the signer for an EIP-712 signature over the built permission.
    ///
    /// A rejection leaves the permission in place so the user can sign again.
    pub async fn sign(&mut self) -> Result<SignedPermission, SessionError> {
        let permission = match &self.session.state {
            SessionState::PermissionBuilt { permission } => permission.clone(),
            state => {
                return Err(TransitionError {
                    state: state.name(),
                    event: "SignatureReturned",
                }
                .into())
            }
        };
        let request = TypedDataRequest::new(self.domain.clone(), permission.clone());
        match self.signer.sign_typed_data(&request).await {
            Ok(signature) => {
                self.advance(SessionEvent::SignatureReturned(signature.clone()))?;
                Ok(SignedPermission {
                    permission,
                    signature,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "signature not obtained");
                self.advance(SessionEvent::SignatureRejected)?;
                Err(err.into())
            }
        }
    }

    /// Re-query the owner's allowance to the manager. Returns whether an approval is still needed.
    pub async fn check_approval(&mut self) -> Result<bool, SessionError> {
        let permission = self.current_permission()?;
        if !approval_applies(&permission, self.builder.capabilities.auxiliary_funds) {
            return Ok(false);
        }
        let preflight = Preflight {
            provider: self.allowances.as_ref(),
            manager: self.manager(),
        };
        let needed = preflight.check(&permission).await;
        let event = if needed {
            SessionEvent::ApprovalRequired
        } else {
            SessionEvent::ApprovalNotRequired
        };
        self.advance(event)?;
        Ok(needed)
    }

    /// Submit `approve(manager, max)` from the owner's wallet.
    pub async fn submit_approval(&mut self) -> Result<B256, SessionError> {
        if !matches!(
            self.session.approval,
            ApprovalGate::Required | ApprovalGate::Pending(_)
        ) {
            return Err(SessionError::ApprovalNotRequired);
        }
        let permission = self.current_permission()?;
        let tx = self
            .wallet
            .submit(ContractCall {
                to: permission.token,
                function: ERC20_APPROVE,
                data: erc20_approve_max_calldata(self.manager()),
            })
            .await?;
        tracing::info!(tx = %tx, token = %permission.token, "approval submitted");
        self.advance(SessionEvent::ApprovalSubmitted(tx))?;
        Ok(tx)
    }

    /// Wait for the pending approval, then re-run the preflight to observe it.
    pub async fn refresh_approval(&mut self, confirmations: usize) -> Result<bool, SessionError> {
        if let ApprovalGate::Pending(tx) = self.session.approval {
            self.wallet.wait_for_confirmation(tx, confirmations).await?;
        }
        let needed = self.check_approval().await?;
        if !needed {
            tracing::info!("approval observed");
        }
        Ok(needed)
    }

    /// Hand the signed permission to the executor.
    pub async fn redeem(&mut self) -> Result<RedemptionReceipt, SessionError> {
        self.advance(SessionEvent::RedemptionSubmitted)?;
        let signed = self
            .session
            .state
            .signed()
            .cloned()
            .ok_or(SessionError::Transition(TransitionError {
                state: self.session.state.name(),
                event: "RedemptionSubmitted",
            }))?;
        match self.redeemer.redeem(&signed).await {
            Ok(receipt) => {
                tracing::info!(
                    approve_tx = %receipt.approve_tx_hash,
                    spend_tx = %receipt.spend_tx_hash,
                    "redemption completed"
                );
                self.advance(SessionEvent::RedemptionSucceeded(receipt))?;
                Ok(receipt)
            }
            Err(failure) => {
                tracing::warn!(error = %failure.describe(), "redemption failed");
                self.advance(SessionEvent::RedemptionFailed(failure.describe()))?;
                Err(failure.into())
            }
        }
    }

    /// Return a failed redemption to `ReadyToRedeem`; the caller re-submits.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        self.advance(SessionEvent::Retry)
    }
}
