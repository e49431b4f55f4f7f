//! Redemption errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use spend_permission_client::RedemptionFailure;
use spend_permission_types::ChainError;
use thiserror::Error;

pub const MISSING_FIELDS: &str = "Missing required fields: permission and signature";
pub const NOT_CONFIGURED: &str = "Private key not configured";
pub const SPEND_FAILED: &str = "Failed to process spend request";

#[derive(Debug, Error)]
pub enum RedeemError {
    #[error("Missing required fields: permission and signature")]
    MissingFields,

    /// The body or permission could not be reconstructed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Private key not configured")]
    NotConfigured,

    /// Another request is already redeeming the same permission.
    #[error("redemption already in progress for this permission")]
    InProgress,

    /// A chain step failed. Earlier steps may already be on-chain.
    #[error("{step} failed: {source}")]
    Chain {
        step: &'static str,
        #[source]
        source: ChainError,
    },
}

impl RedeemError {
    /// - MissingFields / InvalidRequest: 400
    /// - InProgress: 409
    /// - NotConfigured / Chain: 500
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::InProgress => StatusCode::CONFLICT,
            Self::NotConfigured | Self::Chain { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short message for the `error` field.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::MissingFields => MISSING_FIELDS,
            Self::InvalidRequest(_) => "Invalid spend request",
            Self::NotConfigured => NOT_CONFIGURED,
            Self::InProgress => "Redemption already in progress",
            Self::Chain { .. } => SPEND_FAILED,
        }
    }

    /// Underlying message for the `details` field.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::InvalidRequest(details) => Some(details.clone()),
            Self::Chain { .. } => Some(self.to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for RedeemError {
    fn into_response(self) -> Response {
        let body = match self.details() {
            Some(details) => json!({ "error": self.summary(), "details": details }),
            None => json!({ "error": self.summary() }),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<RedeemError> for RedemptionFailure {
    fn from(err: RedeemError) -> Self {
        let failure = RedemptionFailure::new(err.summary());
        match err.details() {
            Some(details) => failure.with_details(details),
            None => failure,
        }
    }
}
