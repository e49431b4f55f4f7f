//! Authorization session as an explicit state machine.
//!
//! `Session::apply` is pure: it consumes the session and an event and returns the next
//! session or a [`TransitionError`], leaving side effects to the [`crate::Authorizer`].

use alloy_primitives::{Bytes, B256};
use spend_permission_types::{RedemptionReceipt, SignedPermission, SpendPermission};

use crate::error::TransitionError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    PermissionBuilt {
        permission: SpendPermission,
    },
    Signed {
        signed: SignedPermission,
    },
    ApprovalPending {
        signed: SignedPermission,
        approval_tx: B256,
    },
    ReadyToRedeem {
        signed: SignedPermission,
    },
    RedemptionPending {
        signed: SignedPermission,
    },
    Completed {
        signed: SignedPermission,
        receipt: RedemptionReceipt,
    },
    Failed {
        signed: SignedPermission,
        error: String,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::PermissionBuilt { .. } => "PermissionBuilt",
            Self::Signed { .. } => "Signed",
            Self::ApprovalPending { .. } => "ApprovalPending",
            Self::ReadyToRedeem { .. } => "ReadyToRedeem",
            Self::RedemptionPending { .. } => "RedemptionPending",
            Self::Completed { .. } => "Completed",
            Self::Failed { .. } => "Failed",
        }
    }

    /// The permission being authorized, once one has been built.
    pub fn permission(&self) -> Option<&SpendPermission> {
        match self {
            Self::Idle => None,
            Self::PermissionBuilt { permission } => Some(permission),
            other => other.signed().map(|s| &s.permission),
        }
    }

    pub fn signed(&self) -> Option<&SignedPermission> {
        match self {
            Self::Idle | Self::PermissionBuilt { .. } => None,
            Self::Signed { signed }
            | Self::ApprovalPending { signed, .. }
            | Self::ReadyToRedeem { signed }
            | Self::RedemptionPending { signed }
            | Self::Completed { signed, .. }
            | Self::Failed { signed, .. } => Some(signed),
        }
    }
}

/// Whether a token approval still stands between the signature and redemption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalGate {
    /// Approval applies but the allowance has not been checked yet.
    Unchecked,
    NotRequired,
    Required,
    Pending(B256),
    Observed,
}

impl ApprovalGate {
    pub fn is_clear(&self) -> bool {
        matches!(self, Self::NotRequired | Self::Observed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Built {
        permission: SpendPermission,
        /// False for native tokens or networks with auxiliary funds.
        approval_applies: bool,
    },
    SignatureReturned(Bytes),
    SignatureRejected,
    ApprovalRequired,
    ApprovalNotRequired,
    ApprovalSubmitted(B256),
    ApprovalObserved,
    RedemptionSubmitted,
    RedemptionSucceeded(RedemptionReceipt),
    RedemptionFailed(String),
    Retry,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Built { .. } => "Built",
            Self::SignatureReturned(_) => "SignatureReturned",
            Self::SignatureRejected => "SignatureRejected",
            Self::ApprovalRequired => "ApprovalRequired",
            Self::ApprovalNotRequired => "ApprovalNotRequired",
            Self::ApprovalSubmitted(_) => "ApprovalSubmitted",
            Self::ApprovalObserved => "ApprovalObserved",
            Self::RedemptionSubmitted => "RedemptionSubmitted",
            Self::RedemptionSucceeded(_) => "RedemptionSucceeded",
            Self::RedemptionFailed(_) => "RedemptionFailed",
            Self::Retry => "Retry",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub state: SessionState,
    pub approval: ApprovalGate,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            approval: ApprovalGate::NotRequired,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(self, event: SessionEvent) -> Result<Session, TransitionError> {
        let reject = TransitionError {
            state: self.state.name(),
            event: event.name(),
        };
        let Session { state, approval } = self;

        let (state, approval) = match (state, event) {
            (
                SessionState::Idle | SessionState::PermissionBuilt { .. },
                SessionEvent::Built {
                    permission,
                    approval_applies,
                },
            ) => {
                let approval = if approval_applies {
                    ApprovalGate::Unchecked
                } else {
                    ApprovalGate::NotRequired
                };
                (SessionState::PermissionBuilt { permission }, approval)
            }

            (SessionState::PermissionBuilt { permission }, SessionEvent::SignatureReturned(signature)) => (
                SessionState::Signed {
                    signed: SignedPermission {
                        permission,
                        signature,
                    },
                },
                approval,
            ),
            (state @ SessionState::PermissionBuilt { .. }, SessionEvent::SignatureRejected) => {
                (state, approval)
            }

            (state, SessionEvent::ApprovalRequired) if accepts_approval_events(&state) => {
                let approval = match approval {
                    // a submitted approval stays pending until it is observed
                    pending @ ApprovalGate::Pending(_) => pending,
                    _ => ApprovalGate::Required,
                };
                (state, approval)
            }
            (state, SessionEvent::ApprovalNotRequired) if accepts_approval_events(&state) => {
                let approval = match approval {
                    ApprovalGate::Required | ApprovalGate::Pending(_) => ApprovalGate::Observed,
                    ApprovalGate::Observed => ApprovalGate::Observed,
                    _ => ApprovalGate::NotRequired,
                };
                (state, approval)
            }
            (state, SessionEvent::ApprovalSubmitted(tx))
                if accepts_approval_events(&state)
                    && matches!(approval, ApprovalGate::Required | ApprovalGate::Pending(_)) =>
            {
                (state, ApprovalGate::Pending(tx))
            }
            (state, SessionEvent::ApprovalObserved)
                if accepts_approval_events(&state)
                    && matches!(approval, ApprovalGate::Required | ApprovalGate::Pending(_)) =>
            {
                (state, ApprovalGate::Observed)
            }

            (SessionState::ReadyToRedeem { signed }, SessionEvent::RedemptionSubmitted)
                if approval.is_clear() =>
            {
                (SessionState::RedemptionPending { signed }, approval)
            }
            (SessionState::RedemptionPending { signed }, SessionEvent::RedemptionSucceeded(receipt)) => {
                (SessionState::Completed { signed, receipt }, approval)
            }
            (SessionState::RedemptionPending { signed }, SessionEvent::RedemptionFailed(error)) => {
                (SessionState::Failed { signed, error }, approval)
            }
            (SessionState::Failed { signed, .. }, SessionEvent::Retry) if approval.is_clear() => {
                (SessionState::ReadyToRedeem { signed }, approval)
            }

            _ => return Err(reject),
        };

        Ok(Session {
            state: settle(state, approval),
            approval,
        })
    }

    pub fn can_redeem(&self) -> bool {
        matches!(self.state, SessionState::ReadyToRedeem { .. }) && self.approval.is_clear()
    }
}

fn accepts_approval_events(state: &SessionState) -> bool {
    matches!(
        state,
        SessionState::PermissionBuilt { .. }
            | SessionState::Signed { .. }
            | SessionState::ApprovalPending { .. }
            | SessionState::ReadyToRedeem { .. }
    )
}

/// Move between the signed-but-not-redeemed states according to the approval gate.
fn settle(state: SessionState, approval: ApprovalGate) -> SessionState {
    match state {
        SessionState::Signed { signed }
        | SessionState::ApprovalPending { signed, .. }
        | SessionState::ReadyToRedeem { signed } => match approval {
            gate if gate.is_clear() => SessionState::ReadyToRedeem { signed },
            ApprovalGate::Pending(approval_tx) => SessionState::ApprovalPending {
                signed,
                approval_tx,
            },
            _ => SessionState::Signed { signed },
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};
    use spend_permission_types::USDC_ADDRESS;

    fn permission() -> SpendPermission {
        SpendPermission {
            account: Address::repeat_byte(1),
            spender: Address::repeat_byte(2),
            token: USDC_ADDRESS,
            allowance: U256::from(10_000_000u64),
            period: 86_400,
            start: 1,
            end: 31_536_001,
            salt: U256::from(9u64),
            extra_data: Bytes::new(),
            hook: Address::ZERO,
            hook_config: Bytes::new(),
        }
    }

    fn signature() -> Bytes {
        Bytes::from(vec![1u8; 65])
    }

    fn receipt() -> RedemptionReceipt {
        RedemptionReceipt {
            approve_tx_hash: B256::repeat_byte(0xaa),
            spend_tx_hash: B256::repeat_byte(0xbb),
        }
    }

    fn built(approval_applies: bool) -> Session {
        Session::new()
            .apply(SessionEvent::Built {
                permission: permission(),
                approval_applies,
            })
            .unwrap()
    }

    fn apply_all(session: Session, events: Vec<SessionEvent>) -> Session {
        events
            .into_iter()
            .fold(session, |s, e| s.apply(e).unwrap())
    }

    #[test]
    fn happy_path_without_approval() {
        let session = apply_all(
            built(false),
            vec![
                SessionEvent::SignatureReturned(signature()),
                SessionEvent::RedemptionSubmitted,
                SessionEvent::RedemptionSucceeded(receipt()),
            ],
        );
        match session.state {
            SessionState::Completed { signed, receipt: r } => {
                assert_eq!(signed.permission, permission());
                assert_eq!(signed.signature, signature());
                assert_eq!(r, receipt());
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn rejection_keeps_the_built_permission() {
        let session = built(false).apply(SessionEvent::SignatureRejected).unwrap();
        assert_eq!(
            session.state,
            SessionState::PermissionBuilt {
                permission: permission()
            }
        );
        let session = session
            .apply(SessionEvent::SignatureReturned(signature()))
            .unwrap();
        assert!(session.can_redeem());
    }

    #[test]
    fn unchecked_approval_blocks_redemption() {
        let session = built(true)
            .apply(SessionEvent::SignatureReturned(signature()))
            .unwrap();
        assert_eq!(session.state.name(), "Signed");
        assert!(!session.can_redeem());
        let err = session.apply(SessionEvent::RedemptionSubmitted).unwrap_err();
        assert_eq!(err.state, "Signed");
        assert_eq!(err.event, "RedemptionSubmitted");
    }

    #[test]
    fn approval_submitted_before_signing() {
        let tx = B256::repeat_byte(0x77);
        let session = apply_all(
            built(true),
            vec![
                SessionEvent::ApprovalRequired,
                SessionEvent::ApprovalSubmitted(tx),
                SessionEvent::SignatureReturned(signature()),
            ],
        );
        assert_eq!(
            session.state,
            SessionState::ApprovalPending {
                signed: SignedPermission {
                    permission: permission(),
                    signature: signature()
                },
                approval_tx: tx,
            }
        );
        // still short: the preflight re-query keeps the approval pending
        let session = session.apply(SessionEvent::ApprovalRequired).unwrap();
        assert_eq!(session.approval, ApprovalGate::Pending(tx));

        let session = session.apply(SessionEvent::ApprovalObserved).unwrap();
        assert!(session.can_redeem());
    }

    #[test]
    fn approval_after_signing() {
        let session = apply_all(
            built(true),
            vec![
                SessionEvent::SignatureReturned(signature()),
                SessionEvent::ApprovalRequired,
            ],
        );
        assert_eq!(session.state.name(), "Signed");
        let session = apply_all(
            session,
            vec![
                SessionEvent::ApprovalSubmitted(B256::repeat_byte(1)),
                SessionEvent::ApprovalNotRequired,
            ],
        );
        assert_eq!(session.approval, ApprovalGate::Observed);
        assert_eq!(session.state.name(), "ReadyToRedeem");
    }

    #[test]
    fn sufficient_allowance_clears_gate() {
        let session = apply_all(
            built(true),
            vec![
                SessionEvent::ApprovalNotRequired,
                SessionEvent::SignatureReturned(signature()),
            ],
        );
        assert!(session.can_redeem());
    }

    #[test]
    fn approval_cannot_be_submitted_when_not_required() {
        let err = built(false)
            .apply(SessionEvent::ApprovalSubmitted(B256::ZERO))
            .unwrap_err();
        assert_eq!(err.event, "ApprovalSubmitted");
    }

    #[test]
    fn failure_allows_explicit_retry() {
        let session = apply_all(
            built(false),
            vec![
                SessionEvent::SignatureReturned(signature()),
                SessionEvent::RedemptionSubmitted,
                SessionEvent::RedemptionFailed("reverted".to_string()),
            ],
        );
        assert_eq!(session.state.name(), "Failed");
        assert_eq!(session.state.signed().unwrap().signature, signature());

        let session = session.apply(SessionEvent::Retry).unwrap();
        assert!(session.can_redeem());
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        assert!(Session::new().apply(SessionEvent::SignatureReturned(signature())).is_err());
        assert!(Session::new().apply(SessionEvent::RedemptionSubmitted).is_err());
        assert!(Session::new().apply(SessionEvent::Retry).is_err());
        assert!(built(false).apply(SessionEvent::RedemptionSucceeded(receipt())).is_err());

        let completed = apply_all(
            built(false),
            vec![
                SessionEvent::SignatureReturned(signature()),
                SessionEvent::RedemptionSubmitted,
                SessionEvent::RedemptionSucceeded(receipt()),
            ],
        );
        assert!(completed.clone().apply(SessionEvent::RedemptionSubmitted).is_err());
        assert!(completed.apply(SessionEvent::Retry).is_err());
    }
}
