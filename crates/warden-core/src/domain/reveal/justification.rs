//! Reveal justification

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reason category an operator gives for a break-the-glass reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealReason {
    SupportTicket,
    LegalRequest,
    AccountRecovery,
    SecurityInvestigation,
    DataSubjectRequest,
    ComplianceAudit,
    Other,
}

impl RevealReason {
    pub const ALL: &[Self] = &[
        Self::SupportTicket,
        Self::LegalRequest,
        Self::AccountRecovery,
        Self::SecurityInvestigation,
        Self::DataSubjectRequest,
        Self::ComplianceAudit,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SupportTicket => "support_ticket",
            Self::LegalRequest => "legal_request",
            Self::AccountRecovery => "account_recovery",
            Self::SecurityInvestigation => "security_investigation",
            Self::DataSubjectRequest => "data_subject_request",
            Self::ComplianceAudit => "compliance_audit",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|reason| reason.as_str() == s)
    }
}

impl std::fmt::Display for RevealReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reason plus optional free text, serialized into the audit entry details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealJustification {
    pub reason: RevealReason,
    pub details: Option<String>,
    pub comments: Option<String>,
}

impl RevealJustification {
    pub fn new(reason: RevealReason) -> Self {
        Self {
            reason,
            details: None,
            comments: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// `Other` requires non-blank details
    pub fn validate(&self) -> Result<()> {
        let has_details = self
            .details
            .as_deref()
            .is_some_and(|details| !details.trim().is_empty());
        if self.reason == RevealReason::Other && !has_details {
            return Err(Error::Validation(
                "details are required when the reason is 'other'".to_string(),
            ));
        }
        Ok(())
    }

    /// The audit entry `details` payload
    pub fn to_audit_details(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_requires_details() {
        let bare = RevealJustification::new(RevealReason::Other);
        assert!(matches!(bare.validate(), Err(Error::Validation(_))));

        let blank = RevealJustification::new(RevealReason::Other).with_details("   ");
        assert!(blank.validate().is_err());

        let ok = RevealJustification::new(RevealReason::Other).with_details("manager approved");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_named_reasons_need_no_details() {
        for reason in RevealReason::ALL.iter().filter(|r| **r != RevealReason::Other) {
            assert!(RevealJustification::new(*reason).validate().is_ok());
        }
    }

    #[test]
    fn test_reason_parse() {
        assert_eq!(
            RevealReason::parse("support_ticket"),
            Some(RevealReason::SupportTicket)
        );
        assert_eq!(RevealReason::parse("SUPPORT"), None);
    }

    #[test]
    fn test_audit_details_shape() {
        let justification = RevealJustification::new(RevealReason::LegalRequest)
            .with_details("subpoena 2024-118")
            .with_comments("via counsel");
        let json: serde_json::Value =
            serde_json::from_str(&justification.to_audit_details().unwrap()).unwrap();
        assert_eq!(json["reason"], "legal_request");
        assert_eq!(json["details"], "subpoena 2024-118");
        assert_eq!(json["comments"], "via counsel");
    }
}
