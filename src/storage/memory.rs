//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::files::Attachment;
use crate::journals::Journal;
use crate::notes::Note;
use crate::reset_tokens::ResetToken;
use crate::users::User;

use super::ChangePasswordValues;
use super::CreateJournalValues;
use super::CreateNoteValues;
use super::CreateResetTokenValues;
use super::CreateUserValues;
use super::Error;
use super::Result;
use super::Storage;
use super::StoreFileValues;
use super::UpdateNoteValues;

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// All users in storage
    users: Arc<Mutex<HashMap<Uuid, User>>>,

    /// All journals in storage
    journals: Arc<Mutex<HashMap<Uuid, Journal>>>,

    /// All notes in storage
    notes: Arc<Mutex<HashMap<Uuid, Note>>>,

    /// All files in storage
    files: Arc<Mutex<HashMap<Uuid, Attachment>>>,

    /// All reset tokens in storage
    reset_tokens: Arc<Mutex<HashMap<Uuid, ResetToken>>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Does the user own the journal
    async fn owns_journal(&self, user_id: &Uuid, journal_id: &Uuid) -> bool {
        self.journals
            .lock()
            .await
            .get(journal_id)
            .is_some_and(|journal| &journal.user_id == user_id)
    }
}

#[async_trait]
impl Storage for Memory {
    async fn find_any_single_user(&self) -> Result<Option<User>> {
        Ok(self.users.lock().await.values().next().cloned())
    }

    async fn find_single_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            session_id: *values.session_id,
            email: values.email.to_string(),
            first_name: values.first_name.to_string(),
            last_name: values.last_name.to_string(),
            hashed_password: values.hashed_password.to_string(),
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };

        self.users.lock().await.insert(user.id, user.clone());

        Ok(user)
    }

    async fn change_password(
        &self,
        user: &User,
        values: &ChangePasswordValues<'_>,
    ) -> Result<User> {
        self.users
            .lock()
            .await
            .get_mut(&user.id)
            .map(|user| {
                user.session_id = *values.session_id;
                user.hashed_password = values.hashed_password.to_string();
                user.updated_at = Utc::now().naive_utc();

                user.clone()
            })
            .ok_or(Error::Missing("user"))
    }

    async fn find_all_journals_by_user(&self, user_id: &Uuid) -> Result<Vec<Journal>> {
        let mut journals = self
            .journals
            .lock()
            .await
            .values()
            .filter(|journal| &journal.user_id == user_id)
            .cloned()
            .collect::<Vec<Journal>>();

        journals.sort_by(|a, b| (a.start_date, a.created_at).cmp(&(b.start_date, b.created_at)));

        Ok(journals)
    }

    async fn find_single_journal(
        &self,
        user_id: &Uuid,
        journal_id: &Uuid,
    ) -> Result<Option<Journal>> {
        Ok(self
            .journals
            .lock()
            .await
            .get(journal_id)
            .filter(|journal| &journal.user_id == user_id)
            .cloned())
    }

    async fn create_journal(&self, values: &CreateJournalValues<'_>) -> Result<Journal> {
        let journal = Journal {
            id: Uuid::new_v4(),
            user_id: values.user.id,
            name: values.name.to_string(),
            start_date: *values.start_date,
            end_date: *values.end_date,
            created_at: Utc::now().naive_utc(),
        };

        self.journals
            .lock()
            .await
            .insert(journal.id, journal.clone());

        Ok(journal)
    }

    async fn find_all_notes_by_journal(&self, journal: &Journal) -> Result<Vec<Note>> {
        let mut notes = self
            .notes
            .lock()
            .await
            .values()
            .filter(|note| note.journal_id == journal.id)
            .cloned()
            .collect::<Vec<Note>>();

        notes.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)));

        Ok(notes)
    }

    async fn find_single_note(
        &self,
        user_id: &Uuid,
        journal_id: &Uuid,
        note_id: &Uuid,
    ) -> Result<Option<Note>> {
        if !self.owns_journal(user_id, journal_id).await {
            return Ok(None);
        }

        Ok(self
            .notes
            .lock()
            .await
            .get(note_id)
            .filter(|note| &note.journal_id == journal_id)
            .cloned())
    }

    async fn find_single_note_by_id(&self, note_id: &Uuid) -> Result<Option<Note>> {
        Ok(self.notes.lock().await.get(note_id).cloned())
    }

    async fn create_note(&self, journal: &Journal, values: &CreateNoteValues<'_>) -> Result<Note> {
        let note = Note {
            id: Uuid::new_v4(),
            journal_id: journal.id,
            date: *values.date,
            destination_name: values.destination_name.to_string(),
            description: values.description.to_string(),
            attachment_ids: values.attachment_ids.to_vec(),
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };

        self.notes.lock().await.insert(note.id, note.clone());

        Ok(note)
    }

    async fn update_note(&self, note: &Note, values: &UpdateNoteValues<'_>) -> Result<Note> {
        self.notes
            .lock()
            .await
            .get_mut(&note.id)
            .map(|note| {
                note.date = *values.date;
                note.destination_name = values.destination_name.to_string();
                note.description = values.description.to_string();
                note.attachment_ids = values.attachment_ids.to_vec();
                note.updated_at = Utc::now().naive_utc();

                note.clone()
            })
            .ok_or(Error::Missing("note"))
    }

    async fn delete_note(&self, note: &Note) -> Result<()> {
        self.notes.lock().await.remove(&note.id);

        Ok(())
    }

    async fn store_file(&self, values: &StoreFileValues<'_>) -> Result<Attachment> {
        let attachment = Attachment {
            id: Uuid::new_v4(),
            file_name: values.file_name.to_string(),
            content_type: values.content_type.to_string(),
            content: values.content.to_vec(),
            created_at: Utc::now().naive_utc(),
        };

        self.files
            .lock()
            .await
            .insert(attachment.id, attachment.clone());

        Ok(attachment)
    }

    async fn find_all_files_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Attachment>> {
        let files = self.files.lock().await;

        Ok(ids.iter().filter_map(|id| files.get(id).cloned()).collect())
    }

    async fn find_single_file_for_user(
        &self,
        user_id: &Uuid,
        file_id: &Uuid,
    ) -> Result<Option<Attachment>> {
        let journal_id = self
            .notes
            .lock()
            .await
            .values()
            .find(|note| note.attachment_ids.contains(file_id))
            .map(|note| note.journal_id);

        let Some(journal_id) = journal_id else {
            return Ok(None);
        };

        if !self.owns_journal(user_id, &journal_id).await {
            return Ok(None);
        }

        Ok(self.files.lock().await.get(file_id).cloned())
    }

    async fn delete_files(&self, ids: &[Uuid]) -> Result<()> {
        let mut files = self.files.lock().await;

        for id in ids {
            files.remove(id);
        }

        Ok(())
    }

    async fn create_reset_token(
        &self,
        values: &CreateResetTokenValues<'_>,
    ) -> Result<ResetToken> {
        let reset_token = ResetToken {
            id: Uuid::new_v4(),
            user_id: values.user.id,
            token: values.token.to_string(),
            expires_at: *values.expires_at,
            used: false,
            created_at: Utc::now().naive_utc(),
        };

        self.reset_tokens
            .lock()
            .await
            .insert(reset_token.id, reset_token.clone());

        Ok(reset_token)
    }

    async fn find_single_reset_token(&self, token: &str) -> Result<Option<ResetToken>> {
        Ok(self
            .reset_tokens
            .lock()
            .await
            .values()
            .find(|reset_token| reset_token.token == token)
            .cloned())
    }

    async fn find_all_reset_tokens_by_user(&self, user: &User) -> Result<Vec<ResetToken>> {
        let mut reset_tokens = self
            .reset_tokens
            .lock()
            .await
            .values()
            .filter(|reset_token| reset_token.user_id == user.id)
            .cloned()
            .collect::<Vec<ResetToken>>();

        reset_tokens.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(reset_tokens)
    }

    async fn mark_reset_token_used(
        &self,
        token: &ResetToken,
        now: &NaiveDateTime,
    ) -> Result<Option<ResetToken>> {
        let mut reset_tokens = self.reset_tokens.lock().await;

        let Some(reset_token) = reset_tokens.get_mut(&token.id) else {
            return Ok(None);
        };

        if !reset_token.is_consumable_at(*now) {
            return Ok(None);
        }

        reset_token.used = true;

        Ok(Some(reset_token.clone()))
    }
}
