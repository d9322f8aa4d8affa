//! Identity establishment and session management for pantry.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod verifier;
mod request_context;

pub use principal::Principal;
pub use session::{Session, SessionManager, SessionToken};
pub use verifier::{CredentialBundle, CredentialVerifier, StsCredentialVerifier};
pub use request_context::RequestContext;
