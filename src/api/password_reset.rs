//! Password reset API endpoints
//!
//! Request a reset link by mail, check the token of the link and set a new password with it

use axum::Extension;
use serde::Deserialize;
use serde::Serialize;

use crate::mailer::SharedMailer;
use crate::reset_tokens::ResetSettings;
use crate::reset_tokens::ResetTokenManager;
use crate::storage::Storage;
use crate::users::normalize_email;

use super::Error;
use super::Form;
use super::PathParameters;
use super::Success;

/// Request reset form
#[derive(Debug, Deserialize)]
pub struct RequestResetForm {
    /// Email address of the account
    email: String,
}

/// Did the mail go out
#[derive(Debug, Serialize)]
pub struct RequestResetResponse {
    pub sent: bool,
}

/// Request a password reset link
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "email": "jane@example.com" }' \
///     http://localhost:6000/api/password-reset
/// ```
///
/// Response:
/// ```json
/// { "data": { "sent": true } }
/// ```
pub async fn request<S: Storage>(
    Extension(storage): Extension<S>,
    Extension(mailer): Extension<SharedMailer>,
    Extension(settings): Extension<ResetSettings>,
    Form(form): Form<RequestResetForm>,
) -> Result<Success<RequestResetResponse>, Error> {
    let user = storage
        .find_single_user_by_email(&normalize_email(&form.email))
        .await
        .map_err(Error::internal_server_error)?
        .ok_or_else(|| Error::not_found("User not found"))?;

    let manager = ResetTokenManager::new(&storage, mailer.as_ref(), &settings);

    let can_issue = manager
        .can_issue_new_token(&user)
        .await
        .map_err(Error::internal_server_error)?;

    if !can_issue {
        return Err(Error::bad_request("A password reset link was already sent"));
    }

    let sent = manager.request_reset(&user).await;

    Ok(Success::ok(RequestResetResponse { sent }))
}

/// Token check response
#[derive(Debug, Serialize)]
pub struct CheckTokenResponse {
    pub valid: bool,
}

/// Check if a reset token can still be used
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/api/password-reset/<token>
/// ```
pub async fn check<S: Storage>(
    Extension(storage): Extension<S>,
    Extension(mailer): Extension<SharedMailer>,
    Extension(settings): Extension<ResetSettings>,
    PathParameters(token): PathParameters<String>,
) -> Result<Success<CheckTokenResponse>, Error> {
    let manager = ResetTokenManager::new(&storage, mailer.as_ref(), &settings);

    let reset_token = manager.lookup_token(&token).await;

    if manager.is_consumable(reset_token.as_ref()) {
        Ok(Success::ok(CheckTokenResponse { valid: true }))
    } else {
        Err(Error::bad_request("Invalid or expired token"))
    }
}

/// New password form
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    /// The new password
    password: String,
}

/// Set a new password with a reset token
///
/// Tokens handed out earlier for the user stop working
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "password": "evenmoresecret" }' \
///     http://localhost:6000/api/password-reset/<token>
/// ```
pub async fn reset<S: Storage>(
    Extension(storage): Extension<S>,
    Extension(mailer): Extension<SharedMailer>,
    Extension(settings): Extension<ResetSettings>,
    PathParameters(token): PathParameters<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Success<&'static str>, Error> {
    ResetTokenManager::new(&storage, mailer.as_ref(), &settings)
        .consume_token(&token, &form.password)
        .await?;

    Ok(Success::<&'static str>::no_content())
}
