//! Diagnostic redaction
//!
//! A `tracing-subscriber` field formatter that scrubs protected values out
//! of every event and span before it is written. Two checks run on each
//! field:
//!
//! - **Type-based**: `Redactable` types render their redacted form through
//!   `Debug` and `Display`, and values already in redacted form pass through
//!   untouched whatever their property name.
//! - **Name-based**: values under a name in [`SENSITIVE_PROPERTY_NAMES`] go
//!   through the same redaction rules used at rest.

pub mod fields;
pub mod names;
pub mod scrub;
pub mod subscriber;

pub use fields::RedactingFields;
pub use names::{SENSITIVE_PROPERTY_NAMES, is_sensitive_name};
pub use scrub::{scrub_scalar, scrub_value};
pub use subscriber::{init_tracing, redacting_subscriber};
