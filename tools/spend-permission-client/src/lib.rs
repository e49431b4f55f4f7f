//! Owner-side authorization flow for spend permissions.

pub mod amount;
pub mod authorizer;
pub mod builder;
pub mod error;
pub mod facts;
pub mod preflight;
pub mod session;
pub mod signing;


pub use amount::parse_units;
pub use authorizer::{Authorizer, Redeemer};
pub use builder::{AuthorizationForm, NetworkCapabilities, PermissionBuilder};
pub use error::{
    AmountError, BuildError, RedemptionFailure, SessionError, SigningError, TransitionError,
};
pub use preflight::{approval_applies, needs_approval, Erc20AllowanceReader, Preflight};
pub use session::{ApprovalGate, Session, SessionEvent, SessionState};
pub use signing::{LocalKeySigner, TypedDataSigner};
