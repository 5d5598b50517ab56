//! Journal API endpoints

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::dates::format_date;
use crate::dates::parse_date;
use crate::journals::Journal;
use crate::storage::CreateJournalValues;
use crate::storage::Storage;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::PathParameters;
use super::Success;

/// Journal response going to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalResponse {
    pub id: Uuid,
    pub name: String,

    /// First day, as `day/month/year`
    pub start_date: String,

    /// Last day, as `day/month/year`
    pub end_date: String,
    pub created_at: NaiveDateTime,
}

impl JournalResponse {
    fn from_journal(journal: Journal) -> Self {
        Self {
            id: journal.id,
            name: journal.name,
            start_date: format_date(journal.start_date),
            end_date: format_date(journal.end_date),
            created_at: journal.created_at,
        }
    }
}

/// List all journals of the current user
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/journals
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
) -> Result<Success<Vec<JournalResponse>>, Error> {
    let journals = storage
        .find_all_journals_by_user(&current_user.id)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::ok(
        journals
            .into_iter()
            .map(JournalResponse::from_journal)
            .collect(),
    ))
}

/// Get a single journal of the current user
pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(journal_id): PathParameters<Uuid>,
) -> Result<Success<JournalResponse>, Error> {
    storage
        .find_single_journal(&current_user.id, &journal_id)
        .await
        .map_err(Error::internal_server_error)?
        .map(|journal| Success::ok(JournalResponse::from_journal(journal)))
        .ok_or_else(|| Error::not_found("Journal not found"))
}

/// Create journal form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJournalForm {
    /// Name of the journal
    name: String,

    /// First day as `day/month/year`
    start_date: String,

    /// Last day as `day/month/year`
    end_date: String,
}

/// Create a journal for the current user
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "name": "Portugal", "startDate": "01/03/2024", "endDate": "10/03/2024" }' \
///     http://localhost:6000/api/journals
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    Form(form): Form<CreateJournalForm>,
) -> Result<Success<JournalResponse>, Error> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(Error::bad_request("Name is required"));
    }

    let start_date = parse_date(&form.start_date)
        .map_err(|_| Error::bad_request("Invalid start date, expected format is day/month/year"))?;
    let end_date = parse_date(&form.end_date)
        .map_err(|_| Error::bad_request("Invalid end date, expected format is day/month/year"))?;

    if start_date > end_date {
        return Err(Error::bad_request("Start date can not be after end date"));
    }

    let values = CreateJournalValues {
        user: &current_user,
        name,
        start_date: &start_date,
        end_date: &end_date,
    };

    let journal = storage
        .create_journal(&values)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::created(JournalResponse::from_journal(journal)))
}
