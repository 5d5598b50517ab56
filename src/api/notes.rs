//! Note API endpoints
//!
//! Notes are created and edited with a multipart body: the JSON fields in the `note` part and
//! every photo in a `files` part.

use axum::Extension;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::dates::format_date;
use crate::files::Attachment;
use crate::notes::Note;
use crate::notes::NoteDetails;
use crate::notes::NoteFields;
use crate::notes::NoteManager;
use crate::storage::Storage;

use super::CurrentUser;
use super::Error;
use super::MultipartForm;
use super::PathParameters;
use super::Success;

/// A note as part of a list
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEntryResponse {
    pub note_id: Uuid,
    pub destination_name: String,

    /// Date as `day/month/year`
    pub date: String,
    pub description: String,
    pub file_ids: Vec<Uuid>,
}

impl NoteEntryResponse {
    fn from_note(note: Note) -> Self {
        Self {
            note_id: note.id,
            destination_name: note.destination_name,
            date: format_date(note.date),
            description: note.description,
            file_ids: note.attachment_ids,
        }
    }
}

/// File information, the content itself is served by the image endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
}

impl FileResponse {
    fn from_attachment(attachment: Attachment) -> Self {
        Self {
            id: attachment.id,
            file_name: attachment.file_name,
            content_type: attachment.content_type,
        }
    }
}

/// A single note with all its details
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDetailsResponse {
    pub journal_id: Uuid,
    pub note_id: Uuid,
    pub files: Vec<FileResponse>,
    pub destination_name: String,

    /// Date as `day/month/year`
    pub date: String,
    pub description: String,
}

impl NoteDetailsResponse {
    fn from_details(details: NoteDetails) -> Self {
        Self {
            journal_id: details.journal_id,
            note_id: details.note_id,
            files: details
                .attachments
                .into_iter()
                .map(FileResponse::from_attachment)
                .collect(),
            destination_name: details.destination_name,
            date: details.date,
            description: details.description,
        }
    }
}

/// The JSON part of a note upload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteForm {
    /// Date as `day/month/year`
    date: String,

    /// Destination name, required when editing
    destination_name: Option<String>,

    /// Description
    #[serde(default)]
    description: String,
}

impl NoteForm {
    fn fields(&self) -> NoteFields<'_> {
        NoteFields {
            date: &self.date,
            destination_name: self.destination_name.as_deref(),
            description: &self.description,
        }
    }
}

/// List all notes of a journal
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/journals/<uuid>/notes
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(journal_id): PathParameters<Uuid>,
) -> Result<Success<Vec<NoteEntryResponse>>, Error> {
    let notes = NoteManager::new(&storage)
        .list_notes(&current_user.id, &journal_id)
        .await?;

    Ok(Success::ok(
        notes.into_iter().map(NoteEntryResponse::from_note).collect(),
    ))
}

/// View a single note
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/journals/<uuid>/notes/<uuid>
/// ```
pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters((journal_id, note_id)): PathParameters<(Uuid, Uuid)>,
) -> Result<Success<NoteDetailsResponse>, Error> {
    let details = NoteManager::new(&storage)
        .get_note_details(&current_user.id, &journal_id, &note_id)
        .await?;

    Ok(Success::ok(NoteDetailsResponse::from_details(details)))
}

/// Create a note with photos
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     -F 'note={"date":"05/03/2024","destinationName":"Lisbon","description":"Tram 28"};type=application/json' \
///     -F 'files=@tram.jpg' \
///     http://localhost:6000/api/journals/<uuid>/notes
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(journal_id): PathParameters<Uuid>,
    MultipartForm { form, files }: MultipartForm<NoteForm>,
) -> Result<Success<NoteEntryResponse>, Error> {
    let note = NoteManager::new(&storage)
        .create_note(&current_user.id, &journal_id, form.fields(), &files)
        .await?;

    Ok(Success::created(NoteEntryResponse::from_note(note)))
}

/// Edit a note, replacing all its fields and photos
///
/// Request:
/// ```sh
/// curl -v -X PUT -H 'Authorization: Bearer tokentokentoken' \
///     -F 'note={"date":"06/03/2024","destinationName":"Sintra","description":"Pena"};type=application/json' \
///     -F 'files=@pena.jpg' \
///     http://localhost:6000/api/journals/<uuid>/notes/<uuid>
/// ```
pub async fn update<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters((journal_id, note_id)): PathParameters<(Uuid, Uuid)>,
    MultipartForm { form, files }: MultipartForm<NoteForm>,
) -> Result<Success<NoteEntryResponse>, Error> {
    let note = NoteManager::new(&storage)
        .edit_note(&current_user.id, &journal_id, &note_id, form.fields(), &files)
        .await?;

    Ok(Success::ok(NoteEntryResponse::from_note(note)))
}

/// Delete a note and its photos
///
/// Request:
/// ```sh
/// curl -v -X DELETE -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/notes/<uuid>
/// ```
pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<Uuid>,
) -> Result<Success<&'static str>, Error> {
    NoteManager::new(&storage)
        .delete_note(&current_user.id, &note_id)
        .await?;

    Ok(Success::<&'static str>::no_content())
}
