//! Sensitive resource notes
//!
//! Notes are free text attached to a resource owned elsewhere (a task, a
//! ticket). They are always stored fully masked and can only be read back
//! through a break-the-glass reveal.

use std::sync::Arc;

use crate::domain::access::{NoteRepository, StoredNote};
use crate::domain::protection::FieldProtector;
use crate::error::{Error, Result};

/// Attaches encrypted notes to resources
#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
    protector: FieldProtector,
}

impl NoteService {
    pub fn new(notes: Arc<dyn NoteRepository>, protector: FieldProtector) -> Self {
        Self { notes, protector }
    }

    /// Encrypt and store a note, replacing any previous note on the resource
    pub async fn attach_note(
        &self,
        resource_id: &str,
        resource_type: &str,
        note: &str,
    ) -> Result<StoredNote> {
        if resource_id.trim().is_empty() || resource_type.trim().is_empty() {
            return Err(Error::Validation(
                "resource id and type must not be empty".to_string(),
            ));
        }

        let stored = StoredNote {
            resource_id: resource_id.to_string(),
            resource_type: resource_type.to_string(),
            note: self.protector.protect_note(note)?,
        };
        self.notes.save(&stored).await?;

        tracing::info!(resource_id = %resource_id, resource_type = %resource_type, "Attached sensitive note");
        Ok(stored)
    }
}

impl std::fmt::Debug for NoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteService").finish_non_exhaustive()
    }
}
