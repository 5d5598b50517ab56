//! File API endpoints
//!
//! Serve the photos of notes

use axum::Extension;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::ACCESS_CONTROL_EXPOSE_HEADERS;
use axum::http::header::CACHE_CONTROL;
use axum::http::header::CONTENT_DISPOSITION;
use axum::http::header::CONTENT_TYPE;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use uuid::Uuid;

use crate::files::content_type_for;
use crate::storage::Storage;

use super::CurrentUser;
use super::Error;
use super::PathParameters;

/// Photos can be cached for 30 days
const CACHE_DIRECTIVE: &str = "max-age=2592000, must-revalidate, no-transform";

/// Characters kept as-is in an RFC 5987 `filename*` value
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Build the `Content-Disposition` value to download a file under its original name
///
/// Non-ASCII names get an ASCII fallback and an UTF-8 `filename*` variant
pub fn content_disposition(file_name: &str) -> String {
    let fallback = file_name
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            ch if ch.is_ascii() && !ch.is_ascii_control() => ch,
            _ => '_',
        })
        .collect::<String>();

    if file_name.is_ascii() && fallback == file_name {
        format!(r#"attachment; filename="{fallback}""#)
    } else {
        format!(
            r#"attachment; filename="{fallback}"; filename*=UTF-8''{}"#,
            utf8_percent_encode(file_name, ATTR_CHAR)
        )
    }
}

fn header_value(value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(Error::internal_server_error)
}

/// Download a photo
///
/// Only photos of notes of the current user are served
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/images/<uuid>
/// ```
pub async fn download<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(file_id): PathParameters<Uuid>,
) -> Result<(StatusCode, HeaderMap, Vec<u8>), Error> {
    let attachment = storage
        .find_single_file_for_user(&current_user.id, &file_id)
        .await
        .map_err(Error::internal_server_error)?
        .ok_or_else(|| Error::not_found("Image not found"))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        header_value(&content_type_for(&attachment.file_name))?,
    );
    headers.insert(
        CONTENT_DISPOSITION,
        header_value(&content_disposition(&attachment.file_name))?,
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_DIRECTIVE));
    headers.insert(
        ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Content-Disposition"),
    );

    Ok((StatusCode::OK, headers, attachment.content))
}
