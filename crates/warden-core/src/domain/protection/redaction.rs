//! Redaction rules
//!
//! Pure, total functions mapping a raw value to a display-safe placeholder.
//! The same rules build the `redacted` column at write time and scrub log
//! properties at log time, so both outputs look identical.

/// Mask inserted between the revealed characters
pub const MASK: &str = "***";

/// Placeholder for short generic values and non-string sensitive scalars
pub const GENERIC_PLACEHOLDER: &str = "***";

/// Placeholder for email values without a maskable local part
pub const EMAIL_PLACEHOLDER: &str = "***@***";

/// Constant placeholder for highly sensitive free text
pub const NOTE_PLACEHOLDER: &str = "[REDACTED]";

/// Which rule applies to a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Email-shaped values
    Email,
    /// Short text such as names
    Generic,
    /// Free text that must never be partially revealed
    Note,
}

impl FieldKind {
    /// Apply this kind's rule to a raw value
    pub fn redact(self, value: &str) -> String {
        match self {
            Self::Email => redact_email(value),
            Self::Generic => redact_generic(value),
            Self::Note => redact_note(value),
        }
    }

    /// Whether `value` already looks like this kind's redaction output
    ///
    /// Holds for the kind's placeholder and for values where the mask sits
    /// right after the first character (`j***@example.com` for emails,
    /// `J***e` otherwise). Every such value is a fixed point of the rule, so
    /// leaving it untouched never reveals more than redacting it again would.
    pub fn is_redacted_form(self, value: &str) -> bool {
        match self {
            Self::Email => is_email_form(value),
            Self::Generic => is_generic_form(value),
            Self::Note => value == NOTE_PLACEHOLDER,
        }
    }
}

/// Redact an email address: `john@example.com` becomes `j***@example.com`
pub fn redact_email(value: &str) -> String {
    let Some((local, domain)) = value.split_once('@') else {
        return EMAIL_PLACEHOLDER.to_string();
    };

    let mut chars = local.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(_)) if !domain.is_empty() => {
            format!("{}{}@{}", first, MASK, domain)
        }
        _ => EMAIL_PLACEHOLDER.to_string(),
    }
}

/// Redact short text: `John Doe` becomes `J***e`
pub fn redact_generic(value: &str) -> String {
    let mut chars = value.chars();
    let first = chars.next();
    let last = chars.next_back();

    match (first, last) {
        (Some(first), Some(last)) if value.chars().count() > 2 => {
            format!("{}{}{}", first, MASK, last)
        }
        _ => GENERIC_PLACEHOLDER.to_string(),
    }
}

/// Redact free text: always the constant placeholder
pub fn redact_note(_value: &str) -> String {
    NOTE_PLACEHOLDER.to_string()
}

fn is_email_form(value: &str) -> bool {
    if value == EMAIL_PLACEHOLDER {
        return true;
    }
    match masked_tail(value).and_then(|tail| tail.strip_prefix('@')) {
        Some(domain) => !domain.is_empty() && redact_email(value) == value,
        None => false,
    }
}

fn is_generic_form(value: &str) -> bool {
    if value == GENERIC_PLACEHOLDER {
        return true;
    }
    match masked_tail(value) {
        Some(tail) => tail.chars().count() == 1 && redact_generic(value) == value,
        None => false,
    }
}

/// What follows `<first char>***`, if the value starts that way
fn masked_tail(value: &str) -> Option<&str> {
    let first = value.chars().next()?;
    value[first.len_utf8()..].strip_prefix(MASK)
}
