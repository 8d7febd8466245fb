//! Break-the-glass reveal commands
//!
//! Every command runs the same fixed sequence and stops at the first failure:
//!
//! 1. validate the justification
//! 2. re-authenticate the acting user with a fresh password
//! 3. decrypt through the [`AccessGateway`]
//! 4. record exactly one audit entry
//! 5. hand back the output-only DTO
//!
//! Nothing is audited when steps 1-3 fail. If step 4 fails the DTO is
//! dropped and the command fails.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::credentials::CredentialVerifier;
use super::justification::RevealJustification;
use crate::domain::access::{AccessGateway, RevealedNote, RevealedSubject, SUBJECT_RESOURCE_TYPE};
use crate::domain::audit::{AuditAction, AuditEntry, AuditTrail, RequestOrigin};
use crate::domain::protection::TransientSecret;
use crate::error::{Error, Result};

/// Who is calling and from where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub actor_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(actor_id: Uuid) -> Self {
        Self {
            actor_id,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_origin(mut self, ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn origin(&self) -> RequestOrigin {
        RequestOrigin {
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Administrator reveals another user's protected attributes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealUserDataCommand {
    pub context: RequestContext,
    pub subject_id: Uuid,
    pub justification: RevealJustification,
    pub password: TransientSecret,
}

/// A user reveals their own protected attributes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealOwnDataCommand {
    pub context: RequestContext,
    pub justification: RevealJustification,
    pub password: TransientSecret,
}

/// Administrator reveals the sensitive note on a resource
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealNoteCommand {
    pub context: RequestContext,
    pub resource_id: String,
    pub justification: RevealJustification,
    pub password: TransientSecret,
}

/// Executes reveal commands
pub struct RevealService {
    gateway: Arc<AccessGateway>,
    credentials: Arc<dyn CredentialVerifier>,
    audit: AuditTrail,
}

impl RevealService {
    pub fn new(
        gateway: Arc<AccessGateway>,
        credentials: Arc<dyn CredentialVerifier>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            gateway,
            credentials,
            audit,
        }
    }

    pub async fn reveal_user_data(&self, command: RevealUserDataCommand) -> Result<RevealedSubject> {
        let RevealUserDataCommand {
            context,
            subject_id,
            justification,
            password,
        } = command;

        self.authorize(&context, &justification, &password).await?;
        let revealed = self.gateway.reveal_for_admin(subject_id).await?;

        let entry = AuditEntry::new(
            Some(context.actor_id),
            AuditAction::ProtectedDataRevealed,
            SUBJECT_RESOURCE_TYPE,
            Some(subject_id.to_string()),
        );
        self.record(entry, &context, &justification).await?;

        tracing::info!(
            actor_id = %context.actor_id,
            subject_id = %subject_id,
            reason = %justification.reason,
            "Protected data revealed"
        );
        Ok(revealed)
    }

    pub async fn reveal_own_data(&self, command: RevealOwnDataCommand) -> Result<RevealedSubject> {
        let RevealOwnDataCommand {
            context,
            justification,
            password,
        } = command;

        self.authorize(&context, &justification, &password).await?;
        let revealed = self.gateway.reveal_for_owner(context.actor_id).await?;

        let entry = AuditEntry::new(
            Some(context.actor_id),
            AuditAction::OwnDataRevealed,
            SUBJECT_RESOURCE_TYPE,
            Some(context.actor_id.to_string()),
        );
        self.record(entry, &context, &justification).await?;

        tracing::info!(actor_id = %context.actor_id, "Own protected data revealed");
        Ok(revealed)
    }

    pub async fn reveal_note(&self, command: RevealNoteCommand) -> Result<RevealedNote> {
        let RevealNoteCommand {
            context,
            resource_id,
            justification,
            password,
        } = command;

        self.authorize(&context, &justification, &password).await?;
        let revealed = self.gateway.reveal_note_for_admin(&resource_id).await?;

        let entry = AuditEntry::new(
            Some(context.actor_id),
            AuditAction::SensitiveNoteRevealed,
            revealed.resource_type.clone(),
            Some(resource_id.clone()),
        );
        self.record(entry, &context, &justification).await?;

        tracing::info!(
            actor_id = %context.actor_id,
            resource_id = %resource_id,
            reason = %justification.reason,
            "Sensitive note revealed"
        );
        Ok(revealed)
    }

    /// Steps 1 and 2: justification, then re-authentication
    async fn authorize(
        &self,
        context: &RequestContext,
        justification: &RevealJustification,
        password: &TransientSecret,
    ) -> Result<()> {
        justification.validate()?;

        if !self
            .credentials
            .verify_password(context.actor_id, password)
            .await?
        {
            // Failed re-authentication is not audited
            tracing::warn!(actor_id = %context.actor_id, "Re-authentication failed for reveal");
            return Err(Error::ReauthenticationFailed);
        }
        Ok(())
    }

    async fn record(
        &self,
        entry: AuditEntry,
        context: &RequestContext,
        justification: &RevealJustification,
    ) -> Result<()> {
        let entry = entry
            .with_details(justification.to_audit_details()?)
            .with_origin(&context.origin());
        self.audit.record(entry).await
    }
}

impl std::fmt::Debug for RevealService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealService")
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::{
        EncryptedSubject, EncryptionKey, FieldCipher, NoteRepository, StoredNote, SubjectRepository,
    };
    use crate::domain::audit::{AuditQuery, AuditRepository, Page};
    use crate::domain::protection::FieldProtector;
    use crate::domain::reveal::RevealReason;
    use crate::infrastructure::{InMemoryAuditRepository, InMemoryNoteRepository};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const PASSWORD: &str = "correct horse battery staple";

    #[derive(Default)]
    struct MockSubjects {
        subjects: Mutex<HashMap<Uuid, EncryptedSubject>>,
    }

    #[async_trait]
    impl SubjectRepository for MockSubjects {
        async fn find_encrypted_attributes(
            &self,
            subject_id: Uuid,
        ) -> Result<Option<EncryptedSubject>> {
            Ok(self.subjects.lock().unwrap().get(&subject_id).cloned())
        }
    }

    /// Accepts a single password for everyone and counts calls
    #[derive(Default)]
    struct MockCredentials {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl CredentialVerifier for MockCredentials {
        async fn verify_password(&self, _subject_id: Uuid, candidate: &TransientSecret) -> Result<bool> {
            *self.calls.lock().unwrap() += 1;
            Ok(candidate.expose() == PASSWORD)
        }
    }

    struct RejectingAuditRepository;

    #[async_trait]
    impl AuditRepository for RejectingAuditRepository {
        async fn add(&self, _entry: &AuditEntry) -> Result<()> {
            Err(Error::Other("disk full".to_string()))
        }

        async fn search(&self, query: &AuditQuery) -> Result<Page<AuditEntry>> {
            Ok(Page::empty(query.page, query.page_size))
        }
    }

    struct Fixture {
        service: RevealService,
        audit: AuditTrail,
        credentials: Arc<MockCredentials>,
        subject_id: Uuid,
        protector: FieldProtector,
        notes: Arc<InMemoryNoteRepository>,
    }

    fn fixture_with_audit(repository: Arc<dyn AuditRepository>) -> Fixture {
        let cipher = Arc::new(FieldCipher::new(&EncryptionKey::generate()));
        let protector = FieldProtector::new(cipher.clone());

        let subject_id = Uuid::new_v4();
        let subjects = Arc::new(MockSubjects::default());
        subjects.subjects.lock().unwrap().insert(
            subject_id,
            EncryptedSubject {
                subject_id,
                email: cipher.encrypt("jane@example.com").unwrap(),
                display_name: cipher.encrypt("Jane Roe").unwrap(),
            },
        );

        let notes = Arc::new(InMemoryNoteRepository::new());
        let audit = AuditTrail::new(repository);
        let gateway = Arc::new(AccessGateway::new(
            cipher,
            subjects,
            notes.clone(),
            audit.clone(),
        ));
        let credentials = Arc::new(MockCredentials::default());
        let service = RevealService::new(gateway, credentials.clone(), audit.clone());

        Fixture {
            service,
            audit,
            credentials,
            subject_id,
            protector,
            notes,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_audit(Arc::new(InMemoryAuditRepository::new()))
    }

    fn admin_command(fx: &Fixture, justification: RevealJustification, password: &str) -> RevealUserDataCommand {
        RevealUserDataCommand {
            context: RequestContext::new(Uuid::new_v4()).with_origin("10.1.2.3", "warden-tests"),
            subject_id: fx.subject_id,
            justification,
            password: TransientSecret::new(password),
        }
    }

    async fn entries(audit: &AuditTrail) -> Vec<AuditEntry> {
        audit.search(AuditQuery::default()).await.unwrap().items
    }

    #[tokio::test]
    async fn test_admin_reveal_records_one_entry() {
        let fx = fixture();
        let justification = RevealJustification::new(RevealReason::SupportTicket)
            .with_details("ticket 4411")
            .with_comments("customer on the phone");
        let command = admin_command(&fx, justification, PASSWORD);
        let actor = command.context.actor_id;

        let revealed = fx.service.reveal_user_data(command).await.unwrap();
        let json = serde_json::to_value(&revealed).unwrap();
        assert_eq!(json["email"], "jane@example.com");
        assert_eq!(json["displayName"], "Jane Roe");

        let entries = entries(&fx.audit).await;
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.action, AuditAction::ProtectedDataRevealed);
        assert_eq!(entry.actor_id, Some(actor));
        assert_eq!(entry.resource_type, "user");
        assert_eq!(
            entry.resource_id.as_deref(),
            Some(fx.subject_id.to_string().as_str())
        );
        assert_eq!(entry.ip_address.as_deref(), Some("10.1.2.3"));

        let details: serde_json::Value =
            serde_json::from_str(entry.details.as_deref().unwrap()).unwrap();
        assert_eq!(details["reason"], "support_ticket");
        assert_eq!(details["details"], "ticket 4411");
        assert_eq!(details["comments"], "customer on the phone");
    }

    #[tokio::test]
    async fn test_other_without_details_fails_before_reauthentication() {
        let fx = fixture();
        let command = admin_command(&fx, RevealJustification::new(RevealReason::Other), PASSWORD);

        let err = fx.service.reveal_user_data(command).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(*fx.credentials.calls.lock().unwrap(), 0);
        assert!(entries(&fx.audit).await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_password_is_not_audited() {
        let fx = fixture();
        let command = admin_command(
            &fx,
            RevealJustification::new(RevealReason::AccountRecovery),
            "guess",
        );

        let err = fx.service.reveal_user_data(command).await.unwrap_err();
        assert!(matches!(err, Error::ReauthenticationFailed));
        assert!(entries(&fx.audit).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_subject_is_not_audited() {
        let fx = fixture();
        let mut command = admin_command(
            &fx,
            RevealJustification::new(RevealReason::LegalRequest),
            PASSWORD,
        );
        command.subject_id = Uuid::new_v4();

        let err = fx.service.reveal_user_data(command).await.unwrap_err();
        assert!(matches!(err, Error::SubjectNotFound(_)));
        assert!(entries(&fx.audit).await.is_empty());
    }

    #[tokio::test]
    async fn test_own_reveal_targets_the_caller() {
        let fx = fixture();
        let command = RevealOwnDataCommand {
            context: RequestContext::new(fx.subject_id),
            justification: RevealJustification::new(RevealReason::DataSubjectRequest),
            password: TransientSecret::new(PASSWORD),
        };

        let revealed = fx.service.reveal_own_data(command).await.unwrap();
        assert_eq!(revealed.subject_id, fx.subject_id);

        let entries = entries(&fx.audit).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::OwnDataRevealed);
        assert_eq!(entries[0].actor_id, Some(fx.subject_id));
    }

    #[tokio::test]
    async fn test_note_reveal_is_audited_against_the_resource() {
        let fx = fixture();
        fx.notes
            .save(&StoredNote {
                resource_id: "task-12".to_string(),
                resource_type: "task".to_string(),
                note: fx.protector.protect_note("escalated to legal").unwrap(),
            })
            .await
            .unwrap();

        let command = RevealNoteCommand {
            context: RequestContext::new(Uuid::new_v4()),
            resource_id: "task-12".to_string(),
            justification: RevealJustification::new(RevealReason::ComplianceAudit),
            password: TransientSecret::new(PASSWORD),
        };
        let note = fx.service.reveal_note(command).await.unwrap();
        assert_eq!(
            serde_json::to_value(&note).unwrap()["note"],
            "escalated to legal"
        );

        let entries = entries(&fx.audit).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::SensitiveNoteRevealed);
        assert_eq!(entries[0].resource_type, "task");
        assert_eq!(entries[0].resource_id.as_deref(), Some("task-12"));
    }

    #[tokio::test]
    async fn test_failed_audit_write_fails_the_reveal() {
        let fx = fixture_with_audit(Arc::new(RejectingAuditRepository));
        let command = admin_command(
            &fx,
            RevealJustification::new(RevealReason::SecurityInvestigation),
            PASSWORD,
        );

        let err = fx.service.reveal_user_data(command).await.unwrap_err();
        assert!(matches!(err, Error::AuditWriteFailed(_)));
    }

    #[test]
    fn test_command_deserializes_with_masked_password() {
        let json = serde_json::json!({
            "context": { "actorId": Uuid::nil(), "ipAddress": null, "userAgent": null },
            "subjectId": Uuid::nil(),
            "justification": { "reason": "other", "details": "audit sample", "comments": null },
            "password": "hunter2"
        });
        let command: RevealUserDataCommand = serde_json::from_value(json).unwrap();
        assert_eq!(command.password.expose(), "hunter2");
        assert!(!format!("{:?}", command).contains("hunter2"));
    }
}
