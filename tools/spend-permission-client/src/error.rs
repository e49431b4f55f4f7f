use spend_permission_encoder::EncodeError;
use spend_permission_types::{ChainError, PermissionError};
use thiserror::Error;

/// Errors parsing a user-entered decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must not be negative")]
    Negative,
    #[error("amount is not a decimal number: {0:?}")]
    Invalid(String),
    #[error("amount does not fit in 256 bits")]
    Overflow,
}

/// Errors building a permission from the form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("missing required fields: account and amount")]
    MissingFields,
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Permission(#[from] PermissionError),
}

/// Outcome of a signing request that produced no signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// The user declined the wallet prompt.
    #[error("signature request rejected")]
    Rejected,
    #[error("signing provider failed: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event `{event}` is not valid in state `{state}`")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("approval is not required for this permission")]
    ApprovalNotRequired,
    #[error("redemption failed: {}", .0.describe())]
    Redemption(#[from] RedemptionFailure),
}

/// A redemption the executor did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RedemptionFailure {
    pub message: String,
    pub details: Option<String>,
}

impl RedemptionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Message and details joined for display.
    pub fn describe(&self) -> String {
        match &self.details {
            Some(details) => format!("{}: {}", self.message, details),
            None => self.message.clone(),
        }
    }
}
