//! Attachments of notes
//!
//! Stored files always carry their original filename, the content type is derived from it

use chrono::naive::NaiveDateTime;
use uuid::Uuid;

/// A stored file, attached to a single note
#[derive(Clone, Debug)]
pub struct Attachment {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub created_at: NaiveDateTime,
}

/// A file as received from the outside world, not stored yet
#[derive(Clone, Debug)]
pub struct Upload {
    /// Original filename as provided by the client
    pub file_name: String,

    /// Raw content, can be empty
    pub content: Vec<u8>,
}

impl Upload {
    pub fn new<N: Into<String>>(file_name: N, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }
}

/// Content type for a filename, based on its extension
///
/// Unknown extensions are served as `application/octet-stream`
pub fn content_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
