//! All things related to the storage of users, journals, notes, files and reset tokens

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::files::Attachment;
use crate::journals::Journal;
use crate::notes::Note;
use crate::reset_tokens::ResetToken;
use crate::users::User;

#[cfg(any(test, not(feature = "postgres")))]
pub use memory::Memory;
#[cfg(feature = "postgres")]
pub use postgres::Postgres;

#[cfg(any(test, not(feature = "postgres")))]
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

/// Setup the storage
#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
pub async fn setup() -> Result<Memory> {
    tracing::info!("Using in-memory storage, all data is lost on shutdown");

    Ok(Memory::new())
}

/// Setup the storage
///
/// Uses the `DATABASE_URL` environment variable
#[cfg(feature = "postgres")]
pub async fn setup() -> Result<Postgres> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| Error::Connection("`DATABASE_URL` is not set".to_string()))?;

    Postgres::new(&database_url).await
}

/// Storage errors
#[derive(Debug, Error)]
pub enum Error {
    /// A connection error with the storage
    #[error("Connection error: {0}")]
    Connection(String),

    /// The record to change no longer exists
    #[error("Record not found: {0}")]
    Missing(&'static str),
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to create a User
pub struct CreateUserValues<'a> {
    /// The initial session ID for the user
    pub session_id: &'a Uuid,

    /// The (normalized) email address, unique
    pub email: &'a str,

    /// First name, used in emails
    pub first_name: &'a str,

    /// Last name, used in emails
    pub last_name: &'a str,

    /// The hashed password
    pub hashed_password: &'a str,
}

/// Values to change a password of a user
pub struct ChangePasswordValues<'a> {
    /// New session ID to invalidate current tokens
    pub session_id: &'a Uuid,

    /// The new hashed password
    pub hashed_password: &'a str,
}

/// Values to create a Journal
pub struct CreateJournalValues<'a> {
    /// Owner of the journal
    pub user: &'a User,

    /// Name of the journal
    pub name: &'a str,

    /// First day of the journal
    pub start_date: &'a NaiveDate,

    /// Last day of the journal, never before the first day
    pub end_date: &'a NaiveDate,
}

/// Values to create a Note
pub struct CreateNoteValues<'a> {
    /// Date of the note, within the journal interval
    pub date: &'a NaiveDate,

    /// Destination name
    pub destination_name: &'a str,

    /// Description
    pub description: &'a str,

    /// Stored attachments, in upload order
    pub attachment_ids: &'a [Uuid],
}

/// Values to update a Note
///
/// All fields are replaced
pub struct UpdateNoteValues<'a> {
    /// New date of the note
    pub date: &'a NaiveDate,

    /// New destination name
    pub destination_name: &'a str,

    /// New description
    pub description: &'a str,

    /// New list of attachments, replaces the old list completely
    pub attachment_ids: &'a [Uuid],
}

/// Values to store a File
pub struct StoreFileValues<'a> {
    /// Original filename
    pub file_name: &'a str,

    /// Content type, derived from the filename
    pub content_type: &'a str,

    /// Raw content
    pub content: &'a [u8],
}

/// Values to create a password reset token
pub struct CreateResetTokenValues<'a> {
    /// User the token belongs to
    pub user: &'a User,

    /// The opaque token, unique
    pub token: &'a str,

    /// Moment the token stops being valid
    pub expires_at: &'a NaiveDateTime,
}

/// Storage with all supported operations
#[async_trait]
pub trait Storage: Clone + Send + Sync + 'static {
    /// Find any single user
    async fn find_any_single_user(&self) -> Result<Option<User>>;

    /// Finds a single user by its (normalized) email address
    async fn find_single_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Finds a single user by its ID
    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>>;

    /// Create a single user
    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User>;

    /// Change the password of a user
    async fn change_password(
        &self,
        user: &User,
        values: &ChangePasswordValues<'_>,
    ) -> Result<User>;

    /// Find all journals of a user
    async fn find_all_journals_by_user(&self, user_id: &Uuid) -> Result<Vec<Journal>>;

    /// Find a single journal, scoped by its owner
    async fn find_single_journal(
        &self,
        user_id: &Uuid,
        journal_id: &Uuid,
    ) -> Result<Option<Journal>>;

    /// Create a journal
    async fn create_journal(&self, values: &CreateJournalValues<'_>) -> Result<Journal>;

    /// Find all notes of a journal
    ///
    /// Ordered by date, oldest first
    async fn find_all_notes_by_journal(&self, journal: &Journal) -> Result<Vec<Note>>;

    /// Find a single note, scoped by the owner of the journal and the journal
    async fn find_single_note(
        &self,
        user_id: &Uuid,
        journal_id: &Uuid,
        note_id: &Uuid,
    ) -> Result<Option<Note>>;

    /// Find a single note by ID only
    ///
    /// DOES NOT check the ownership, handle with care
    async fn find_single_note_by_id(&self, note_id: &Uuid) -> Result<Option<Note>>;

    /// Create a note
    async fn create_note(&self, journal: &Journal, values: &CreateNoteValues<'_>) -> Result<Note>;

    /// Update a note
    async fn update_note(&self, note: &Note, values: &UpdateNoteValues<'_>) -> Result<Note>;

    /// Delete a note
    ///
    /// Its files are not touched, delete them separately
    async fn delete_note(&self, note: &Note) -> Result<()>;

    /// Store a file
    async fn store_file(&self, values: &StoreFileValues<'_>) -> Result<Attachment>;

    /// Find all files by their IDs
    ///
    /// Keeps the order of the IDs, unknown IDs are skipped
    async fn find_all_files_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Attachment>>;

    /// Find a single file, only when it is attached to a note of the user
    async fn find_single_file_for_user(
        &self,
        user_id: &Uuid,
        file_id: &Uuid,
    ) -> Result<Option<Attachment>>;

    /// Delete files
    async fn delete_files(&self, ids: &[Uuid]) -> Result<()>;

    /// Create a password reset token
    async fn create_reset_token(&self, values: &CreateResetTokenValues<'_>)
    -> Result<ResetToken>;

    /// Find a single reset token by its opaque value
    async fn find_single_reset_token(&self, token: &str) -> Result<Option<ResetToken>>;

    /// Find all reset tokens of a user, used or not
    async fn find_all_reset_tokens_by_user(&self, user: &User) -> Result<Vec<ResetToken>>;

    /// Mark a reset token as used, there is no way back
    ///
    /// Only succeeds for a token that is unused and not expired at `now`, a single caller can
    /// claim a token. `None` when the token could not be claimed.
    async fn mark_reset_token_used(
        &self,
        token: &ResetToken,
        now: &NaiveDateTime,
    ) -> Result<Option<ResetToken>>;
}
