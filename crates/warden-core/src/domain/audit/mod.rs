//! Audit trail
//!
//! Append-only record of every auditable action. Crypto reveals are written
//! by the access gateway and reveal commands; everything else arrives as a
//! domain event through [`AuditEventHandler`].

pub mod entity;
pub mod handler;
pub mod repository;
pub mod trail;

pub use entity::{AuditAction, AuditEntry, AuditQuery, DEFAULT_PAGE_SIZE, Page, RequestOrigin};
pub use handler::AuditEventHandler;
pub use repository::AuditRepository;
pub use trail::{AuditTrail, MAX_PAGE_SIZE};
