//! In-memory repositories
//!
//! Same semantics as the SQLite repositories, backed by `RwLock`ed
//! collections. Used by unit tests and throwaway setups.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::access::{EncryptedSubject, NoteRepository, StoredNote, SubjectRepository};
use crate::domain::audit::{AuditEntry, AuditQuery, AuditRepository, Page};
use crate::domain::users::{User, UserRepository};
use crate::error::{Error, Result};

fn poisoned<T>(_: T) -> Error {
    Error::Other("repository lock poisoned".to_string())
}

/// In-memory user repository
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users
            .values()
            .any(|existing| existing.email.hash() == user.email.hash())
        {
            return Err(Error::DuplicateEmail);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users
            .values()
            .any(|existing| existing.id != user.id && existing.email.hash() == user.email.hash())
        {
            return Err(Error::DuplicateEmail);
        }
        match users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(Error::SubjectNotFound(user.id.to_string())),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email_hash(&self, hash: &str) -> Result<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .values()
            .find(|user| user.email.hash() == Some(hash))
            .cloned())
    }
}

#[async_trait]
impl SubjectRepository for InMemoryUserRepository {
    async fn find_encrypted_attributes(&self, subject_id: Uuid) -> Result<Option<EncryptedSubject>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&subject_id).map(User::encrypted_attributes))
    }
}

/// In-memory note repository
#[derive(Debug, Default)]
pub struct InMemoryNoteRepository {
    notes: RwLock<HashMap<String, StoredNote>>,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteRepository for InMemoryNoteRepository {
    async fn save(&self, note: &StoredNote) -> Result<()> {
        let mut notes = self.notes.write().map_err(poisoned)?;
        notes.insert(note.resource_id.clone(), note.clone());
        Ok(())
    }

    async fn find_by_resource(&self, resource_id: &str) -> Result<Option<StoredNote>> {
        let notes = self.notes.read().map_err(poisoned)?;
        Ok(notes.get(resource_id).cloned())
    }
}

/// In-memory audit trail, append-only
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn add(&self, entry: &AuditEntry) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.push(entry.clone());
        Ok(())
    }

    async fn search(&self, query: &AuditQuery) -> Result<Page<AuditEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;

        // Newest first; later insertions win ties
        let mut matching: Vec<(usize, &AuditEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| query.matches(entry))
            .collect();
        matching.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));

        let total_count = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .map(|(_, entry)| entry.clone())
            .collect();

        Ok(Page {
            items,
            total_count,
            page: query.page,
            page_size: query.page_size,
        })
    }
}
