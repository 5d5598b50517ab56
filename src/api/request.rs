//! API request helpers

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::extract::Json;
use axum::extract::Multipart;
use axum::extract::Path;
use axum::extract::Request;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::PathRejection;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::files::Upload;

use super::Error;

/// Multipart part holding the JSON fields of a note
pub const NOTE_PART: &str = "note";

/// Multipart part holding a single photo, can be repeated
pub const FILES_PART: &str = "files";

fn parse_json<J>(json: Result<Json<J>, JsonRejection>) -> Result<J, Error> {
    match json {
        Ok(Json(json)) => Ok(json),
        Err(err) => match err {
            JsonRejection::JsonDataError(err) => {
                Err(Error::bad_request("Data error").with_description(err))
            }
            JsonRejection::JsonSyntaxError(err) => {
                let description = std::error::Error::source(&err)
                    .map_or_else(|| err.body_text(), ToString::to_string);

                Err(Error::bad_request("JSON syntax error").with_description(description))
            }
            JsonRejection::MissingJsonContentType(_err) => Err(Error::bad_request(
                "Missing `application/json` content type",
            )),
            JsonRejection::BytesRejection(err) => {
                Err(Error::bad_request("Invalid characters in JSON").with_description(err))
            }
            err => Err(Error::bad_request("Unknown JSON error").with_description(err)),
        },
    }
}

/// Wrapper for the JSON extractor
pub struct Form<F>(pub F);

impl<S, F> FromRequest<S> for Form<F>
where
    S: Send + Sync,
    F: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json = Json::<F>::from_request(req, state).await;

        parse_json(json).map(Form)
    }
}

fn parse_path<P>(path: Result<Path<P>, PathRejection>) -> Result<P, Error> {
    match path {
        Ok(Path(path)) => Ok(path),
        Err(err) => match err {
            PathRejection::FailedToDeserializePathParams(err) => {
                Err(Error::bad_request("Invalid path parameter").with_description(err))
            }
            PathRejection::MissingPathParams(err) => {
                Err(Error::bad_request("Missing path parameter").with_description(err))
            }
            err => Err(Error::bad_request("Unknown path error").with_description(err)),
        },
    }
}

/// Wrapper for the path extractor
pub struct PathParameters<P>(pub P);

impl<S, P> FromRequestParts<S> for PathParameters<P>
where
    S: Send + Sync,
    P: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let path = Path::<P>::from_request_parts(parts, state).await;

        parse_path(path).map(PathParameters)
    }
}

/// A multipart upload with JSON fields and files
///
/// The JSON lives in the `note` part, every `files` part is a single file. Other parts are
/// ignored.
pub struct MultipartForm<F> {
    /// The JSON fields
    pub form: F,

    /// All files, in the order they were sent
    pub files: Vec<Upload>,
}

fn invalid_multipart<D: ToString>(description: D) -> Error {
    Error::bad_request("Invalid multipart body").with_description(description)
}

impl<S, F> FromRequest<S> for MultipartForm<F>
where
    S: Send + Sync,
    F: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|err| invalid_multipart(err.body_text()))?;

        let mut form = None;
        let mut files = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| invalid_multipart(err.body_text()))?
        {
            let name = field.name().map(ToString::to_string);

            match name.as_deref() {
                Some(NOTE_PART) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|err| invalid_multipart(err.body_text()))?;

                    let fields = serde_json::from_slice::<F>(&bytes)
                        .map_err(|err| Error::bad_request("Data error").with_description(err))?;

                    form = Some(fields);
                }
                Some(FILES_PART) => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content = field
                        .bytes()
                        .await
                        .map_err(|err| invalid_multipart(err.body_text()))?;

                    files.push(Upload::new(file_name, content.to_vec()));
                }
                other => {
                    tracing::debug!("Ignoring unknown multipart part: {other:?}");
                }
            }
        }

        let form =
            form.ok_or_else(|| Error::bad_request(format!("Missing `{NOTE_PART}` part")))?;

        Ok(Self { form, files })
    }
}
