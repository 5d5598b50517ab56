//! Postgres storage

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
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

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Postgres storage
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Create Postgres storage
    ///
    /// Migrations will be run
    pub async fn new(database_url: &str) -> Result<Self> {
        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .map_err(connection_error)?;

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn new_with_pool(connection_pool: PgPool) -> Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .map_err(|err| Error::Connection(format!("Migrations could not run: {err}")))?;

        Ok(Self { connection_pool })
    }
}

/// Postgres version of user
#[derive(sqlx::FromRow)]
struct PostgresUser {
    id: Uuid,
    session_id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    hashed_password: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<PostgresUser> for User {
    fn from(user: PostgresUser) -> Self {
        Self {
            id: user.id,
            session_id: user.session_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            hashed_password: user.hashed_password,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Postgres version of journal
#[derive(sqlx::FromRow)]
struct PostgresJournal {
    id: Uuid,
    user_id: Uuid,
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    created_at: NaiveDateTime,
}

impl From<PostgresJournal> for Journal {
    fn from(journal: PostgresJournal) -> Self {
        Self {
            id: journal.id,
            user_id: journal.user_id,
            name: journal.name,
            start_date: journal.start_date,
            end_date: journal.end_date,
            created_at: journal.created_at,
        }
    }
}

/// Postgres version of note, the attachments live in an `UUID[]` column
#[derive(sqlx::FromRow)]
struct PostgresNote {
    id: Uuid,
    journal_id: Uuid,
    date: NaiveDate,
    destination_name: String,
    description: String,
    attachment_ids: Vec<Uuid>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<PostgresNote> for Note {
    fn from(note: PostgresNote) -> Self {
        Self {
            id: note.id,
            journal_id: note.journal_id,
            date: note.date,
            destination_name: note.destination_name,
            description: note.description,
            attachment_ids: note.attachment_ids,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// Postgres version of file
#[derive(sqlx::FromRow)]
struct PostgresFile {
    id: Uuid,
    file_name: String,
    content_type: String,
    content: Vec<u8>,
    created_at: NaiveDateTime,
}

impl From<PostgresFile> for Attachment {
    fn from(file: PostgresFile) -> Self {
        Self {
            id: file.id,
            file_name: file.file_name,
            content_type: file.content_type,
            content: file.content,
            created_at: file.created_at,
        }
    }
}

/// Postgres version of password reset token
#[derive(sqlx::FromRow)]
struct PostgresResetToken {
    id: Uuid,
    user_id: Uuid,
    token: String,
    expires_at: NaiveDateTime,
    used: bool,
    created_at: NaiveDateTime,
}

impl From<PostgresResetToken> for ResetToken {
    fn from(token: PostgresResetToken) -> Self {
        Self {
            id: token.id,
            user_id: token.user_id,
            token: token.token,
            expires_at: token.expires_at,
            used: token.used,
            created_at: token.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, session_id, email, first_name, last_name, hashed_password, created_at, updated_at";

const NOTE_COLUMNS: &str = "notes.id, notes.journal_id, notes.date, notes.destination_name, \
    notes.description, notes.attachment_ids, notes.created_at, notes.updated_at";

#[async_trait]
impl Storage for Postgres {
    async fn find_any_single_user(&self) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, PostgresUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users LIMIT 1"
        ))
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(User::from))
    }

    async fn find_single_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, PostgresUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(User::from))
    }

    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, PostgresUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(User::from))
    }

    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User> {
        let user = sqlx::query_as::<_, PostgresUser>(&format!(
            r"
            INSERT INTO users (id, session_id, email, first_name, last_name, hashed_password)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(values.session_id)
        .bind(values.email)
        .bind(values.first_name)
        .bind(values.last_name)
        .bind(values.hashed_password)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.into())
    }

    async fn change_password(
        &self,
        user: &User,
        values: &ChangePasswordValues<'_>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, PostgresUser>(&format!(
            r"
            UPDATE users
            SET session_id = $1, hashed_password = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(values.session_id)
        .bind(values.hashed_password)
        .bind(user.id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?
        .ok_or(Error::Missing("user"))?;

        Ok(user.into())
    }

    async fn find_all_journals_by_user(&self, user_id: &Uuid) -> Result<Vec<Journal>> {
        let journals = sqlx::query_as::<_, PostgresJournal>(
            r"
            SELECT id, user_id, name, start_date, end_date, created_at
            FROM journals
            WHERE user_id = $1
            ORDER BY start_date, created_at
            ",
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(journals.into_iter().map(Journal::from).collect())
    }

    async fn find_single_journal(
        &self,
        user_id: &Uuid,
        journal_id: &Uuid,
    ) -> Result<Option<Journal>> {
        let journal = sqlx::query_as::<_, PostgresJournal>(
            r"
            SELECT id, user_id, name, start_date, end_date, created_at
            FROM journals
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(journal_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(journal.map(Journal::from))
    }

    async fn create_journal(&self, values: &CreateJournalValues<'_>) -> Result<Journal> {
        let journal = sqlx::query_as::<_, PostgresJournal>(
            r"
            INSERT INTO journals (id, user_id, name, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, name, start_date, end_date, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(values.user.id)
        .bind(values.name)
        .bind(values.start_date)
        .bind(values.end_date)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(journal.into())
    }

    async fn find_all_notes_by_journal(&self, journal: &Journal) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, PostgresNote>(&format!(
            r"
            SELECT {NOTE_COLUMNS}
            FROM notes
            WHERE journal_id = $1
            ORDER BY date, created_at
            "
        ))
        .bind(journal.id)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(notes.into_iter().map(Note::from).collect())
    }

    async fn find_single_note(
        &self,
        user_id: &Uuid,
        journal_id: &Uuid,
        note_id: &Uuid,
    ) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, PostgresNote>(&format!(
            r"
            SELECT {NOTE_COLUMNS}
            FROM notes
            INNER JOIN journals ON journals.id = notes.journal_id
            WHERE notes.id = $1 AND notes.journal_id = $2 AND journals.user_id = $3
            "
        ))
        .bind(note_id)
        .bind(journal_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(note.map(Note::from))
    }

    async fn find_single_note_by_id(&self, note_id: &Uuid) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, PostgresNote>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1"
        ))
        .bind(note_id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(note.map(Note::from))
    }

    async fn create_note(&self, journal: &Journal, values: &CreateNoteValues<'_>) -> Result<Note> {
        let note = sqlx::query_as::<_, PostgresNote>(&format!(
            r"
            INSERT INTO notes (id, journal_id, date, destination_name, description, attachment_ids)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {NOTE_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(journal.id)
        .bind(values.date)
        .bind(values.destination_name)
        .bind(values.description)
        .bind(values.attachment_ids)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(note.into())
    }

    async fn update_note(&self, note: &Note, values: &UpdateNoteValues<'_>) -> Result<Note> {
        let updated_note = sqlx::query_as::<_, PostgresNote>(&format!(
            r"
            UPDATE notes
            SET date = $1,
                destination_name = $2,
                description = $3,
                attachment_ids = $4,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $5
            RETURNING {NOTE_COLUMNS}
            "
        ))
        .bind(values.date)
        .bind(values.destination_name)
        .bind(values.description)
        .bind(values.attachment_ids)
        .bind(note.id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?
        .ok_or(Error::Missing("note"))?;

        Ok(updated_note.into())
    }

    async fn delete_note(&self, note: &Note) -> Result<()> {
        sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(note.id)
            .execute(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(())
    }

    async fn store_file(&self, values: &StoreFileValues<'_>) -> Result<Attachment> {
        let file = sqlx::query_as::<_, PostgresFile>(
            r"
            INSERT INTO files (id, file_name, content_type, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, file_name, content_type, content, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(values.file_name)
        .bind(values.content_type)
        .bind(values.content)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(file.into())
    }

    async fn find_all_files_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Attachment>> {
        let mut files = sqlx::query_as::<_, PostgresFile>(
            r"
            SELECT id, file_name, content_type, content, created_at
            FROM files
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        // same order as requested
        files.sort_by_key(|file| ids.iter().position(|id| *id == file.id));

        Ok(files.into_iter().map(Attachment::from).collect())
    }

    async fn find_single_file_for_user(
        &self,
        user_id: &Uuid,
        file_id: &Uuid,
    ) -> Result<Option<Attachment>> {
        let file = sqlx::query_as::<_, PostgresFile>(
            r"
            SELECT files.id, files.file_name, files.content_type, files.content, files.created_at
            FROM files
            WHERE files.id = $1
                AND EXISTS (
                    SELECT 1
                    FROM notes
                    INNER JOIN journals ON journals.id = notes.journal_id
                    WHERE files.id = ANY(notes.attachment_ids) AND journals.user_id = $2
                )
            ",
        )
        .bind(file_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(file.map(Attachment::from))
    }

    async fn delete_files(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM files WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(())
    }

    async fn create_reset_token(
        &self,
        values: &CreateResetTokenValues<'_>,
    ) -> Result<ResetToken> {
        let token = sqlx::query_as::<_, PostgresResetToken>(
            r"
            INSERT INTO reset_tokens (id, user_id, token, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token, expires_at, used, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(values.user.id)
        .bind(values.token)
        .bind(values.expires_at)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(token.into())
    }

    async fn find_single_reset_token(&self, token: &str) -> Result<Option<ResetToken>> {
        let token = sqlx::query_as::<_, PostgresResetToken>(
            r"
            SELECT id, user_id, token, expires_at, used, created_at
            FROM reset_tokens
            WHERE token = $1
            ",
        )
        .bind(token)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(token.map(ResetToken::from))
    }

    async fn find_all_reset_tokens_by_user(&self, user: &User) -> Result<Vec<ResetToken>> {
        let tokens = sqlx::query_as::<_, PostgresResetToken>(
            r"
            SELECT id, user_id, token, expires_at, used, created_at
            FROM reset_tokens
            WHERE user_id = $1
            ORDER BY created_at
            ",
        )
        .bind(user.id)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(tokens.into_iter().map(ResetToken::from).collect())
    }

    async fn mark_reset_token_used(
        &self,
        token: &ResetToken,
        now: &NaiveDateTime,
    ) -> Result<Option<ResetToken>> {
        let token = sqlx::query_as::<_, PostgresResetToken>(
            r"
            UPDATE reset_tokens
            SET used = TRUE
            WHERE id = $1 AND used = FALSE AND expires_at >= $2
            RETURNING id, user_id, token, expires_at, used, created_at
            ",
        )
        .bind(token.id)
        .bind(now)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(token.map(ResetToken::from))
    }
}

/// Convert `SQLx` to storage connection error
fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}
