//! Users
//!
//! The aggregate that owns protected email and display-name fields.

pub mod entity;
pub mod events;
pub mod repository;
pub mod service;

pub use entity::User;
pub use events::{UserEvent, UserEventType};
pub use repository::{CredentialHasher, UserRepository};
pub use service::{MIN_PASSWORD_LEN, UserCredentialVerifier, UserService};
