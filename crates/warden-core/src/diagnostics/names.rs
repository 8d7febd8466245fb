//! Sensitive log property names

/// Property names whose values are always scrubbed, in normalized form
///
/// Matching lowercases the property name and drops `_` and `-`, so
/// `displayName`, `display_name` and `DISPLAY_NAME` all hit `displayname`.
pub const SENSITIVE_PROPERTY_NAMES: &[&str] = &[
    "email",
    "emailaddress",
    "password",
    "displayname",
    "username",
    "firstname",
    "lastname",
    "phonenumber",
];

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether a property name is on the sensitive list
pub fn is_sensitive_name(name: &str) -> bool {
    let normalized = normalize(name);
    SENSITIVE_PROPERTY_NAMES.contains(&normalized.as_str())
}

/// Whether the email rule applies to a sensitive property
pub fn is_email_name(name: &str) -> bool {
    normalize(name).contains("email")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_across_case_and_separators() {
        for name in [
            "email",
            "Email",
            "EMAIL",
            "emailAddress",
            "email_address",
            "Password",
            "displayName",
            "display_name",
            "userName",
            "user_name",
            "firstName",
            "last_name",
            "phoneNumber",
            "phone_number",
        ] {
            assert!(is_sensitive_name(name), "{} should be sensitive", name);
        }
    }

    #[test]
    fn test_other_names_are_not_sensitive() {
        for name in ["message", "user_id", "action", "emails_sent", "AuthorName"] {
            assert!(!is_sensitive_name(name), "{} should not be sensitive", name);
        }
    }

    #[test]
    fn test_email_rule_selection() {
        assert!(is_email_name("EmailAddress"));
        assert!(!is_email_name("display_name"));
    }
}
