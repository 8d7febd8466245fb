//! Value scrubbing applied to every log field

use std::borrow::Cow;

use super::names::{is_email_name, is_sensitive_name};
use crate::domain::protection::{FieldKind, GENERIC_PLACEHOLDER};

/// Scrub one textual field value
///
/// A sensitive property name picks the email or generic redaction rule.
/// Values already shaped like that rule's output (anything rendered from a
/// `Redactable`) pass through as they are. Notes render as a constant
/// placeholder, which passes under any non-email name.
pub fn scrub_value<'a>(name: &str, value: &'a str) -> Cow<'a, str> {
    if !is_sensitive_name(name) {
        return Cow::Borrowed(value);
    }

    let kind = if is_email_name(name) {
        FieldKind::Email
    } else {
        FieldKind::Generic
    };
    let passes = kind.is_redacted_form(value)
        || (kind == FieldKind::Generic && FieldKind::Note.is_redacted_form(value));
    if passes {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(kind.redact(value))
    }
}

/// Placeholder for a non-textual value under a sensitive name
pub fn scrub_scalar(name: &str) -> Option<&'static str> {
    is_sensitive_name(name).then_some(GENERIC_PLACEHOLDER)
}
