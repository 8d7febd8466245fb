//! Domain layer
//!
//! - **Protection**: redaction rules, lookup hashing and protected value types
//! - **Access**: the cipher and the single audited decryption gateway
//! - **Reveal**: break-the-glass commands (justification + re-authentication)
//! - **Audit**: append-only audit trail
//! - **Users**: the aggregate owning protected email and display name
//! - **Notes**: sensitive free-text notes on resources
//! - **Events**: domain events and the in-process bus

pub mod access;
pub mod audit;
pub mod events;
pub mod notes;
pub mod protection;
pub mod reveal;
pub mod users;
