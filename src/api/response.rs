//! API response helpers
//!
//! Successful responses are wrapped as `{ "data": ... }`, failures as
//! `{ "error": "...", "description": "..." }`

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;

use crate::notes::NoteError;
use crate::reset_tokens::ResetError;

/// Hold data for a successful API interaction
pub struct Success<V>
where
    V: Serialize,
{
    status_code: StatusCode,
    data: Option<V>,
}

impl<V> Success<V>
where
    V: Serialize,
{
    pub fn ok(data: V) -> Self {
        Self {
            status_code: StatusCode::OK,
            data: Some(data),
        }
    }

    pub fn created(data: V) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            data: Some(data),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status_code: StatusCode::NO_CONTENT,
            data: None,
        }
    }
}

#[derive(Serialize)]
struct DataWrapper<D>
where
    D: Serialize,
{
    data: D,
}

impl<V> IntoResponse for Success<V>
where
    V: Serialize,
{
    fn into_response(self) -> Response {
        match self.data {
            Some(data) => (self.status_code, Json(DataWrapper { data })).into_response(),
            None => self.status_code.into_response(),
        }
    }
}

/// Hold data for a failed API interaction
#[derive(Debug)]
pub struct Error {
    status_code: StatusCode,
    message: String,
    description: Option<String>,
}

impl Error {
    fn new<M: ToString>(status_code: StatusCode, message: M) -> Self {
        Self {
            status_code,
            message: message.to_string(),
            description: None,
        }
    }

    pub fn bad_request<M: ToString>(message: M) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden<M: ToString>(message: M) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found<M: ToString>(message: M) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Something broke on our side, the message is logged as well
    pub fn internal_server_error<M: ToString>(message: M) -> Self {
        let error = Self::new(StatusCode::INTERNAL_SERVER_ERROR, message);

        tracing::error!("Internal server error: {}", error.message);

        error
    }

    pub fn with_description<M: ToString>(self, description: M) -> Self {
        Self {
            description: Some(description.to_string()),
            ..self
        }
    }
}

#[derive(Serialize)]
struct ErrorWrapper {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (
            self.status_code,
            Json(ErrorWrapper {
                error: self.message,
                description: self.description,
            }),
        )
            .into_response()
    }
}

impl From<NoteError> for Error {
    fn from(err: NoteError) -> Self {
        match err {
            NoteError::NotFound(_) => Self::not_found(err),
            NoteError::BadRequest(message) => Self::bad_request(message),
            NoteError::Storage(err) => Self::internal_server_error(err),
        }
    }
}

impl From<ResetError> for Error {
    fn from(err: ResetError) -> Self {
        match err {
            ResetError::BadRequest(message) => Self::bad_request(message),
            err => Self::internal_server_error(err),
        }
    }
}
