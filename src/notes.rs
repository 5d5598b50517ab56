//! Notes of a journal
//!
//! A note is a dated entry within a journal, with a destination, a description and up to
//! seven photos. All rules around creating, editing and deleting notes live in the
//! [`NoteManager`].

use std::collections::HashSet;

use chrono::NaiveDate;
use chrono::naive::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::dates::format_date;
use crate::dates::parse_date;
use crate::files::Attachment;
use crate::files::Upload;
use crate::files::content_type_for;
use crate::journals::Journal;
use crate::storage;
use crate::storage::CreateNoteValues;
use crate::storage::Storage;
use crate::storage::StoreFileValues;
use crate::storage::UpdateNoteValues;

/// Text fields can hold at most one character less than this
pub const MAX_TEXT_LENGTH: usize = 250;

/// Maximum number of photos of a single note
pub const MAX_ATTACHMENTS: usize = 7;

#[derive(Clone, Debug)]
pub struct Note {
    pub id: Uuid,
    pub journal_id: Uuid,
    pub date: NaiveDate,
    pub destination_name: String,
    pub description: String,
    pub attachment_ids: Vec<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Failures of note operations
#[derive(Debug, Error)]
pub enum NoteError {
    /// Journal or note is absent, or belongs to someone else
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The input violates one of the note rules
    #[error("{0}")]
    BadRequest(String),

    /// The storage failed
    #[error(transparent)]
    Storage(#[from] storage::Error),
}

impl NoteError {
    fn bad_request<M: ToString>(message: M) -> Self {
        Self::BadRequest(message.to_string())
    }
}

pub type Result<T> = core::result::Result<T, NoteError>;

/// The textual fields of a note, as provided by the user
#[derive(Clone, Copy, Debug)]
pub struct NoteFields<'a> {
    /// Date as `day/month/year`
    pub date: &'a str,

    /// Destination name, required when editing
    pub destination_name: Option<&'a str>,

    /// Description
    pub description: &'a str,
}

/// Everything needed to show a single note
#[derive(Debug)]
pub struct NoteDetails {
    pub journal_id: Uuid,
    pub note_id: Uuid,
    pub attachments: Vec<Attachment>,
    pub destination_name: String,

    /// Date rendered as `day/month/year`
    pub date: String,
    pub description: String,
}

/// Outcome of matching the current attachments of a note against new uploads
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Attachments without an upload of the same filename
    pub removed: Vec<Attachment>,

    /// Attachments with an upload of the same filename, the upload takes over their slot
    pub replaced: Vec<Attachment>,
}

impl Reconciliation {
    /// IDs of every attachment that is no longer part of the note
    pub fn obsolete_ids(&self) -> Vec<Uuid> {
        self.removed
            .iter()
            .chain(self.replaced.iter())
            .map(|attachment| attachment.id)
            .collect()
    }
}

/// Match the current attachments against new uploads, by filename only
///
/// Two files with the same name count as the same photo, even when their content differs
pub fn reconcile_attachments(existing: Vec<Attachment>, uploads: &[Upload]) -> Reconciliation {
    let uploaded_names = uploads
        .iter()
        .map(|upload| upload.file_name.as_str())
        .collect::<HashSet<&str>>();

    let (replaced, removed): (Vec<Attachment>, Vec<Attachment>) = existing
        .into_iter()
        .partition(|attachment| uploaded_names.contains(attachment.file_name.as_str()));

    Reconciliation { removed, replaced }
}

/// Check the amount of uploads
///
/// No uploads at all is fine, a single empty upload (an empty file field) is not
fn validate_uploads(uploads: &[Upload]) -> Result<()> {
    if let [upload] = uploads {
        if upload.content.is_empty() {
            return Err(NoteError::bad_request(
                "At least one photo must be uploaded",
            ));
        }
    }

    if uploads.len() > MAX_ATTACHMENTS {
        return Err(NoteError::bad_request(format!(
            "A maximum of {MAX_ATTACHMENTS} photos can be uploaded"
        )));
    }

    Ok(())
}

fn validate_length(label: &str, value: &str) -> Result<()> {
    if value.chars().count() >= MAX_TEXT_LENGTH {
        return Err(NoteError::bad_request(format!(
            "{label} should be less than {MAX_TEXT_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Parse the date and make sure it is within the journal
fn validate_date(date: &str, journal: &Journal) -> Result<NaiveDate> {
    let date = parse_date(date).map_err(|_| {
        NoteError::bad_request("Invalid date, expected format is day/month/year")
    })?;

    if !journal.contains(date) {
        return Err(NoteError::bad_request(
            "The specified date is outside the range of the travel journal",
        ));
    }

    Ok(date)
}

/// Note operations on behalf of a user
pub struct NoteManager<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> NoteManager<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Fetch the journal of the user
    pub async fn journal(&self, user_id: &Uuid, journal_id: &Uuid) -> Result<Journal> {
        self.storage
            .find_single_journal(user_id, journal_id)
            .await?
            .ok_or(NoteError::NotFound("Journal"))
    }

    /// All notes of a journal of the user
    pub async fn list_notes(&self, user_id: &Uuid, journal_id: &Uuid) -> Result<Vec<Note>> {
        let journal = self.journal(user_id, journal_id).await?;

        Ok(self.storage.find_all_notes_by_journal(&journal).await?)
    }

    /// Create a note in a journal of the user
    pub async fn create_note(
        &self,
        user_id: &Uuid,
        journal_id: &Uuid,
        fields: NoteFields<'_>,
        uploads: &[Upload],
    ) -> Result<Note> {
        let journal = self.journal(user_id, journal_id).await?;

        validate_uploads(uploads)?;
        let date = validate_date(fields.date, &journal)?;
        validate_length("Description", fields.description)?;

        let destination_name = fields.destination_name.unwrap_or_default();
        validate_length("Destination name", destination_name)?;

        let attachments = self.store_uploads(uploads).await?;
        let attachment_ids = attachments
            .iter()
            .map(|attachment| attachment.id)
            .collect::<Vec<Uuid>>();

        let values = CreateNoteValues {
            date: &date,
            destination_name,
            description: fields.description,
            attachment_ids: &attachment_ids,
        };

        match self.storage.create_note(&journal, &values).await {
            Ok(note) => {
                tracing::debug!(
                    "Created note {} with {} photo(s) in journal {}",
                    note.id,
                    attachment_ids.len(),
                    journal.id
                );

                Ok(note)
            }
            Err(err) => {
                self.discard_files(&attachment_ids).await;

                Err(err.into())
            }
        }
    }

    /// Edit a note of the user
    ///
    /// All fields are replaced. Every upload is stored again, current photos are dropped
    /// once the note is updated.
    pub async fn edit_note(
        &self,
        user_id: &Uuid,
        journal_id: &Uuid,
        note_id: &Uuid,
        fields: NoteFields<'_>,
        uploads: &[Upload],
    ) -> Result<Note> {
        let note = self.note(user_id, journal_id, note_id).await?;
        let journal = self.journal(user_id, &note.journal_id).await?;

        let destination_name = match fields.destination_name {
            Some(destination_name) if !destination_name.is_empty() => destination_name,
            _ => return Err(NoteError::bad_request("Destination name is required")),
        };

        validate_uploads(uploads)?;
        validate_length("Destination name", destination_name)?;
        validate_length("Description", fields.description)?;
        let date = validate_date(fields.date, &journal)?;

        let existing = self
            .storage
            .find_all_files_by_ids(&note.attachment_ids)
            .await?;
        let reconciliation = reconcile_attachments(existing, uploads);

        let attachments = self.store_uploads(uploads).await?;
        let attachment_ids = attachments
            .iter()
            .map(|attachment| attachment.id)
            .collect::<Vec<Uuid>>();

        let values = UpdateNoteValues {
            date: &date,
            destination_name,
            description: fields.description,
            attachment_ids: &attachment_ids,
        };

        let note = match self.storage.update_note(&note, &values).await {
            Ok(note) => note,
            Err(err) => {
                self.discard_files(&attachment_ids).await;

                return Err(err.into());
            }
        };

        tracing::debug!(
            "Updated note {}: {} photo(s) removed, {} replaced, {} stored",
            note.id,
            reconciliation.removed.len(),
            reconciliation.replaced.len(),
            attachment_ids.len()
        );

        // the note is saved, old photos are cleaned up best-effort
        self.discard_files(&reconciliation.obsolete_ids()).await;

        Ok(note)
    }

    /// Delete a note of the user, including its photos
    pub async fn delete_note(&self, user_id: &Uuid, note_id: &Uuid) -> Result<()> {
        let note = self
            .storage
            .find_single_note_by_id(note_id)
            .await?
            .ok_or(NoteError::NotFound("Note"))?;

        // the journal lookup is scoped by owner, someone else's note is just as absent
        if self
            .storage
            .find_single_journal(user_id, &note.journal_id)
            .await?
            .is_none()
        {
            return Err(NoteError::NotFound("Note"));
        }

        self.storage.delete_files(&note.attachment_ids).await?;
        self.storage.delete_note(&note).await?;

        tracing::debug!("Deleted note {} and its photos", note.id);

        Ok(())
    }

    /// Everything about a single note of the user
    pub async fn get_note_details(
        &self,
        user_id: &Uuid,
        journal_id: &Uuid,
        note_id: &Uuid,
    ) -> Result<NoteDetails> {
        let note = self.note(user_id, journal_id, note_id).await?;

        let attachments = self
            .storage
            .find_all_files_by_ids(&note.attachment_ids)
            .await?;

        Ok(NoteDetails {
            journal_id: note.journal_id,
            note_id: note.id,
            attachments,
            destination_name: note.destination_name,
            date: format_date(note.date),
            description: note.description,
        })
    }

    async fn note(&self, user_id: &Uuid, journal_id: &Uuid, note_id: &Uuid) -> Result<Note> {
        self.storage
            .find_single_note(user_id, journal_id, note_id)
            .await?
            .ok_or(NoteError::NotFound("Note"))
    }

    /// Store all uploads, in order
    ///
    /// Either all uploads are stored, or none are
    async fn store_uploads(&self, uploads: &[Upload]) -> Result<Vec<Attachment>> {
        let mut attachments = Vec::with_capacity(uploads.len());

        for upload in uploads {
            let content_type = content_type_for(&upload.file_name);

            let values = StoreFileValues {
                file_name: &upload.file_name,
                content_type: &content_type,
                content: &upload.content,
            };

            match self.storage.store_file(&values).await {
                Ok(attachment) => attachments.push(attachment),
                Err(err) => {
                    let stored = attachments
                        .iter()
                        .map(|attachment: &Attachment| attachment.id)
                        .collect::<Vec<Uuid>>();
                    self.discard_files(&stored).await;

                    return Err(err.into());
                }
            }
        }

        Ok(attachments)
    }

    /// Best-effort removal of files that did not make it into a note
    async fn discard_files(&self, ids: &[Uuid]) {
        if ids.is_empty() {
            return;
        }

        if let Err(err) = self.storage.delete_files(ids).await {
            tracing::error!("Could not discard {} orphaned file(s): {err}", ids.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::reset_tokens::ResetToken;
    use crate::storage::ChangePasswordValues;
    use crate::storage::CreateJournalValues;
    use crate::storage::CreateResetTokenValues;
    use crate::storage::CreateUserValues;
    use crate::storage::Memory;
    use crate::users::User;

    async fn setup() -> (Memory, User, Journal) {
        let storage = Memory::new();

        let user = storage
            .create_user(&CreateUserValues {
                session_id: &Uuid::new_v4(),
                email: "jane@example.com",
                first_name: "Jane",
                last_name: "Doe",
                hashed_password: "not-a-hash",
            })
            .await
            .unwrap();

        let journal = storage
            .create_journal(&CreateJournalValues {
                user: &user,
                name: "Portugal",
                start_date: &NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                end_date: &NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            })
            .await
            .unwrap();

        (storage, user, journal)
    }

    fn fields<'a>(date: &'a str, description: &'a str) -> NoteFields<'a> {
        NoteFields {
            date,
            destination_name: Some("Lisbon"),
            description,
        }
    }

    fn photo(name: &str) -> Upload {
        Upload::new(name, name.as_bytes().to_vec())
    }

    fn attachment(name: &str) -> Attachment {
        Attachment {
            id: Uuid::new_v4(),
            file_name: name.to_string(),
            content_type: content_type_for(name),
            content: Vec::new(),
            created_at: Utc::now().naive_utc(),
        }
    }

    fn assert_bad_request<T: std::fmt::Debug>(result: Result<T>) {
        assert!(
            matches!(result, Err(NoteError::BadRequest(_))),
            "expected a bad request, got {result:?}"
        );
    }

    #[test]
    fn test_reconcile_by_filename() {
        let existing = vec![attachment("a.jpg"), attachment("b.jpg")];
        let uploads = vec![photo("b.jpg"), photo("c.jpg")];

        let reconciliation = reconcile_attachments(existing, &uploads);

        assert_eq!(1, reconciliation.removed.len());
        assert_eq!("a.jpg", reconciliation.removed[0].file_name);
        assert_eq!(1, reconciliation.replaced.len());
        assert_eq!("b.jpg", reconciliation.replaced[0].file_name);
        assert_eq!(2, reconciliation.obsolete_ids().len());
    }

    #[test]
    fn test_reconcile_without_uploads_removes_everything() {
        let existing = vec![attachment("a.jpg"), attachment("b.jpg")];

        let reconciliation = reconcile_attachments(existing, &[]);

        assert_eq!(2, reconciliation.removed.len());
        assert!(reconciliation.replaced.is_empty());
    }

    #[test]
    fn test_validate_uploads() {
        assert!(validate_uploads(&[]).is_ok());
        assert!(validate_uploads(&[photo("a.jpg")]).is_ok());
        assert_bad_request(validate_uploads(&[Upload::new("a.jpg", Vec::new())]));

        // an empty file among others is not checked
        assert!(validate_uploads(&[photo("a.jpg"), Upload::new("b.jpg", Vec::new())]).is_ok());

        let seven = (0..7).map(|i| photo(&format!("{i}.jpg"))).collect::<Vec<_>>();
        assert!(validate_uploads(&seven).is_ok());

        let eight = (0..8).map(|i| photo(&format!("{i}.jpg"))).collect::<Vec<_>>();
        assert_bad_request(validate_uploads(&eight));
    }

    #[test]
    fn test_validate_length_boundary() {
        assert!(validate_length("Description", &"x".repeat(249)).is_ok());
        assert_bad_request(validate_length("Description", &"x".repeat(250)));

        // characters, not bytes
        assert!(validate_length("Description", &"é".repeat(249)).is_ok());
    }

    #[tokio::test]
    async fn test_create_note_date_boundaries() {
        let (storage, user, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        for date in ["01/03/2024", "10/03/2024", "5/3/2024"] {
            let note = manager
                .create_note(&user.id, &journal.id, fields(date, ""), &[photo("a.jpg")])
                .await;
            assert!(note.is_ok(), "{date} should be accepted");
        }

        for date in ["29/02/2024", "11/03/2024", "2024-03-05"] {
            let note = manager
                .create_note(&user.id, &journal.id, fields(date, ""), &[photo("a.jpg")])
                .await;
            assert_bad_request(note);
        }
    }

    #[tokio::test]
    async fn test_create_note_stores_photos() {
        let (storage, user, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        let note = manager
            .create_note(
                &user.id,
                &journal.id,
                fields("05/03/2024", "Tram 28"),
                &[photo("a.jpg"), photo("b.png")],
            )
            .await
            .unwrap();

        let files = storage
            .find_all_files_by_ids(&note.attachment_ids)
            .await
            .unwrap();

        assert_eq!(2, files.len());
        assert_eq!("a.jpg", files[0].file_name);
        assert_eq!("image/jpeg", files[0].content_type);
        assert_eq!("b.png", files[1].file_name);
        assert_eq!(b"b.png".to_vec(), files[1].content);
    }

    #[tokio::test]
    async fn test_create_note_without_photos() {
        let (storage, user, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        let note = manager
            .create_note(&user.id, &journal.id, fields("05/03/2024", ""), &[])
            .await
            .unwrap();

        assert!(note.attachment_ids.is_empty());
    }

    #[tokio::test]
    async fn test_create_note_in_foreign_journal() {
        let (storage, _, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        let result = manager
            .create_note(&Uuid::new_v4(), &journal.id, fields("05/03/2024", ""), &[])
            .await;

        assert!(matches!(result, Err(NoteError::NotFound("Journal"))));
    }

    #[tokio::test]
    async fn test_edit_note_reconciles_photos() {
        let (storage, user, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        let note = manager
            .create_note(
                &user.id,
                &journal.id,
                fields("05/03/2024", ""),
                &[photo("a.jpg"), photo("b.jpg")],
            )
            .await
            .unwrap();
        let old_ids = note.attachment_ids.clone();

        let note = manager
            .edit_note(
                &user.id,
                &journal.id,
                &note.id,
                fields("06/03/2024", "Sintra"),
                &[Upload::new("b.jpg", b"new b".to_vec()), photo("c.jpg")],
            )
            .await
            .unwrap();

        let files = storage
            .find_all_files_by_ids(&note.attachment_ids)
            .await
            .unwrap();
        let names = files
            .iter()
            .map(|file| file.file_name.as_str())
            .collect::<Vec<&str>>();

        assert_eq!(vec!["b.jpg", "c.jpg"], names);
        assert_eq!(b"new b".to_vec(), files[0].content);
        assert_eq!("Sintra", note.description);

        // old content is gone from storage
        assert!(
            storage
                .find_all_files_by_ids(&old_ids)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_edit_note_requires_destination() {
        let (storage, user, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        let note = manager
            .create_note(&user.id, &journal.id, fields("05/03/2024", ""), &[])
            .await
            .unwrap();

        for destination_name in [None, Some("")] {
            let result = manager
                .edit_note(
                    &user.id,
                    &journal.id,
                    &note.id,
                    NoteFields {
                        date: "05/03/2024",
                        destination_name,
                        description: "",
                    },
                    &[],
                )
                .await;

            assert_bad_request(result);
        }
    }

    #[tokio::test]
    async fn test_failed_edit_keeps_note() {
        let (storage, user, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        let note = manager
            .create_note(&user.id, &journal.id, fields("05/03/2024", ""), &[photo("a.jpg")])
            .await
            .unwrap();

        let result = manager
            .edit_note(
                &user.id,
                &journal.id,
                &note.id,
                fields("05/04/2024", ""),
                &[photo("b.jpg")],
            )
            .await;
        assert_bad_request(result);

        let details = manager
            .get_note_details(&user.id, &journal.id, &note.id)
            .await
            .unwrap();
        assert_eq!(1, details.attachments.len());
        assert_eq!("a.jpg", details.attachments[0].file_name);
    }

    #[tokio::test]
    async fn test_delete_note_removes_photos() {
        let (storage, user, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        let note = manager
            .create_note(&user.id, &journal.id, fields("05/03/2024", ""), &[photo("a.jpg")])
            .await
            .unwrap();

        let result = manager.delete_note(&Uuid::new_v4(), &note.id).await;
        assert!(matches!(result, Err(NoteError::NotFound("Note"))));

        manager.delete_note(&user.id, &note.id).await.unwrap();

        assert!(
            storage
                .find_single_note_by_id(&note.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            storage
                .find_all_files_by_ids(&note.attachment_ids)
                .await
                .unwrap()
                .is_empty()
        );

        let result = manager.delete_note(&user.id, &note.id).await;
        assert!(matches!(result, Err(NoteError::NotFound("Note"))));
    }

    #[tokio::test]
    async fn test_note_details() {
        let (storage, user, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        let note = manager
            .create_note(
                &user.id,
                &journal.id,
                fields("05/03/2024", "Pastéis de nata"),
                &[photo("a.jpg")],
            )
            .await
            .unwrap();

        let details = manager
            .get_note_details(&user.id, &journal.id, &note.id)
            .await
            .unwrap();

        assert_eq!(journal.id, details.journal_id);
        assert_eq!(note.id, details.note_id);
        assert_eq!("5/3/2024", details.date);
        assert_eq!("Lisbon", details.destination_name);
        assert_eq!("Pastéis de nata", details.description);
        assert_eq!(1, details.attachments.len());

        let result = manager
            .get_note_details(&Uuid::new_v4(), &journal.id, &note.id)
            .await;
        assert!(matches!(result, Err(NoteError::NotFound("Note"))));
    }

    #[tokio::test]
    async fn test_destination_length_boundary() {
        let (storage, user, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        let accepted = "x".repeat(249);
        let rejected = "x".repeat(250);

        let with_destination = |destination_name| NoteFields {
            date: "05/03/2024",
            destination_name: Some(destination_name),
            description: "",
        };

        let note = manager
            .create_note(&user.id, &journal.id, with_destination(&accepted), &[])
            .await
            .unwrap();
        assert_eq!(accepted, note.destination_name);

        let result = manager
            .create_note(&user.id, &journal.id, with_destination(&rejected), &[])
            .await;
        assert_bad_request(result);

        let result = manager
            .edit_note(&user.id, &journal.id, &note.id, with_destination(&rejected), &[])
            .await;
        assert_bad_request(result);

        let note = manager
            .edit_note(&user.id, &journal.id, &note.id, with_destination(&accepted), &[])
            .await
            .unwrap();
        assert_eq!(accepted, note.destination_name);
    }

    #[tokio::test]
    async fn test_edit_note_upload_rules() {
        let (storage, user, journal) = setup().await;
        let manager = NoteManager::new(&storage);

        let note = manager
            .create_note(&user.id, &journal.id, fields("05/03/2024", ""), &[photo("a.jpg")])
            .await
            .unwrap();

        let result = manager
            .edit_note(
                &user.id,
                &journal.id,
                &note.id,
                fields("05/03/2024", ""),
                &[Upload::new("", Vec::new())],
            )
            .await;
        assert_bad_request(result);

        let eight = (0..8).map(|i| photo(&format!("{i}.jpg"))).collect::<Vec<_>>();
        let result = manager
            .edit_note(&user.id, &journal.id, &note.id, fields("05/03/2024", ""), &eight)
            .await;
        assert_bad_request(result);

        let note = manager
            .edit_note(
                &user.id,
                &journal.id,
                &note.id,
                fields("05/03/2024", ""),
                &eight[..7],
            )
            .await
            .unwrap();
        assert_eq!(7, note.attachment_ids.len());
    }

    /// Memory storage where removing files always fails
    #[derive(Clone)]
    struct StuckFiles(Memory);

    #[async_trait]
    impl Storage for StuckFiles {
        async fn find_any_single_user(&self) -> storage::Result<Option<User>> {
            self.0.find_any_single_user().await
        }

        async fn find_single_user_by_email(&self, email: &str) -> storage::Result<Option<User>> {
            self.0.find_single_user_by_email(email).await
        }

        async fn find_single_user_by_id(&self, id: &Uuid) -> storage::Result<Option<User>> {
            self.0.find_single_user_by_id(id).await
        }

        async fn create_user(&self, values: &CreateUserValues<'_>) -> storage::Result<User> {
            self.0.create_user(values).await
        }

        async fn change_password(
            &self,
            user: &User,
            values: &ChangePasswordValues<'_>,
        ) -> storage::Result<User> {
            self.0.change_password(user, values).await
        }

        async fn find_all_journals_by_user(&self, user_id: &Uuid) -> storage::Result<Vec<Journal>> {
            self.0.find_all_journals_by_user(user_id).await
        }

        async fn find_single_journal(
            &self,
            user_id: &Uuid,
            journal_id: &Uuid,
        ) -> storage::Result<Option<Journal>> {
            self.0.find_single_journal(user_id, journal_id).await
        }

        async fn create_journal(
            &self,
            values: &CreateJournalValues<'_>,
        ) -> storage::Result<Journal> {
            self.0.create_journal(values).await
        }

        async fn find_all_notes_by_journal(&self, journal: &Journal) -> storage::Result<Vec<Note>> {
            self.0.find_all_notes_by_journal(journal).await
        }

        async fn find_single_note(
            &self,
            user_id: &Uuid,
            journal_id: &Uuid,
            note_id: &Uuid,
        ) -> storage::Result<Option<Note>> {
            self.0.find_single_note(user_id, journal_id, note_id).await
        }

        async fn find_single_note_by_id(&self, note_id: &Uuid) -> storage::Result<Option<Note>> {
            self.0.find_single_note_by_id(note_id).await
        }

        async fn create_note(
            &self,
            journal: &Journal,
            values: &CreateNoteValues<'_>,
        ) -> storage::Result<Note> {
            self.0.create_note(journal, values).await
        }

        async fn update_note(
            &self,
            note: &Note,
            values: &UpdateNoteValues<'_>,
        ) -> storage::Result<Note> {
            self.0.update_note(note, values).await
        }

        async fn delete_note(&self, note: &Note) -> storage::Result<()> {
            self.0.delete_note(note).await
        }

        async fn store_file(&self, values: &StoreFileValues<'_>) -> storage::Result<Attachment> {
            self.0.store_file(values).await
        }

        async fn find_all_files_by_ids(&self, ids: &[Uuid]) -> storage::Result<Vec<Attachment>> {
            self.0.find_all_files_by_ids(ids).await
        }

        async fn find_single_file_for_user(
            &self,
            user_id: &Uuid,
            file_id: &Uuid,
        ) -> storage::Result<Option<Attachment>> {
            self.0.find_single_file_for_user(user_id, file_id).await
        }

        async fn delete_files(&self, _ids: &[Uuid]) -> storage::Result<()> {
            Err(storage::Error::Connection("file store unavailable".to_string()))
        }

        async fn create_reset_token(
            &self,
            values: &CreateResetTokenValues<'_>,
        ) -> storage::Result<ResetToken> {
            self.0.create_reset_token(values).await
        }

        async fn find_single_reset_token(&self, token: &str) -> storage::Result<Option<ResetToken>> {
            self.0.find_single_reset_token(token).await
        }

        async fn find_all_reset_tokens_by_user(
            &self,
            user: &User,
        ) -> storage::Result<Vec<ResetToken>> {
            self.0.find_all_reset_tokens_by_user(user).await
        }

        async fn mark_reset_token_used(
            &self,
            token: &ResetToken,
            now: &NaiveDateTime,
        ) -> storage::Result<Option<ResetToken>> {
            self.0.mark_reset_token_used(token, now).await
        }
    }

    #[tokio::test]
    async fn test_saved_edit_survives_failed_cleanup() {
        let (memory, user, journal) = setup().await;
        let storage = StuckFiles(memory);
        let manager = NoteManager::new(&storage);

        let note = manager
            .create_note(&user.id, &journal.id, fields("05/03/2024", ""), &[photo("a.jpg")])
            .await
            .unwrap();

        let edited = manager
            .edit_note(
                &user.id,
                &journal.id,
                &note.id,
                fields("06/03/2024", "Sintra"),
                &[photo("b.jpg")],
            )
            .await
            .unwrap();

        let details = manager
            .get_note_details(&user.id, &journal.id, &note.id)
            .await
            .unwrap();
        assert_eq!(edited.attachment_ids, vec![details.attachments[0].id]);
        assert_eq!("b.jpg", details.attachments[0].file_name);
        assert_eq!("Sintra", details.description);
    }
}
