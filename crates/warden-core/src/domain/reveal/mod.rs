//! Break-the-glass reveal
//!
//! Justification, re-authentication, and the audited reveal commands built
//! on top of [`crate::domain::access::AccessGateway`].

pub mod commands;
pub mod credentials;
pub mod justification;

pub use commands::{
    RequestContext, RevealNoteCommand, RevealOwnDataCommand, RevealService, RevealUserDataCommand,
};
pub use credentials::CredentialVerifier;
pub use justification::{RevealJustification, RevealReason};
