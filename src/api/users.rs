//! User API endpoints
//!
//! Login, registration and the current user

use axum::Extension;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::password::hash;
use crate::password::verify;
use crate::storage::CreateUserValues;
use crate::storage::Storage;
use crate::users::User;
use crate::users::normalize_email;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::JwtKeys;
use super::Success;
use super::current_user::Token;
use super::current_user::generate_token;

/// The user response information
///
/// A subset of all the information, ready to be serialized for the outside world
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// The user ID
    pub id: Uuid,

    /// The email address
    pub email: String,

    /// First name
    pub first_name: String,

    /// Last name
    pub last_name: String,
}

impl UserResponse {
    /// Create a user response from a [`User`](User)
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Login form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    /// Email address of the user
    email: String,
    /// Password of the user
    password: String,
}

/// Get a token for a user "session"
///
/// The token can then be used to access the rest of the API routes by using it in the
/// `Authorization` header
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "email": "jane@example.com", "password": "verysecret" }' \
///     http://localhost:6000/api/users/token
/// ```
///
/// Response
/// ```json
/// { "data": { "token_type": "Bearer", "expires_in": 3600, "access_token": "some token" } }
/// ```
pub async fn token<S: Storage>(
    Extension(jwt_keys): Extension<JwtKeys>,
    Extension(storage): Extension<S>,
    Form(form): Form<LoginForm>,
) -> Result<Success<Token>, Error> {
    let user = storage
        .find_single_user_by_email(&normalize_email(&form.email))
        .await
        .map_err(Error::internal_server_error)?;

    match user {
        Some(user) if verify(&user.hashed_password, &form.password) => {
            Ok(Success::ok(generate_token(&jwt_keys, &user)?))
        }
        _ => Err(Error::bad_request("Invalid user")),
    }
}

/// Registration form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    /// Email address, used to log in
    email: String,
    /// Password
    password: String,
    /// First name
    first_name: String,
    /// Last name
    last_name: String,
}

/// Register a new user
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "email": "jane@example.com", "password": "verysecret", "firstName": "Jane", "lastName": "Doe" }' \
///     http://localhost:6000/api/users
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": "<uuid>", "email": "jane@example.com", "firstName": "Jane", "lastName": "Doe" } }
/// ```
pub async fn register<S: Storage>(
    Extension(storage): Extension<S>,
    Form(form): Form<RegisterForm>,
) -> Result<Success<UserResponse>, Error> {
    let email = normalize_email(&form.email);

    if !email.contains('@') {
        return Err(Error::bad_request("Invalid email address"));
    }

    if form.password.is_empty() {
        return Err(Error::bad_request("Password can not be empty"));
    }

    let existing_user = storage
        .find_single_user_by_email(&email)
        .await
        .map_err(Error::internal_server_error)?;

    if existing_user.is_some() {
        return Err(Error::bad_request("Email address already in use"));
    }

    let hashed_password = hash(&form.password).map_err(Error::internal_server_error)?;

    let values = CreateUserValues {
        session_id: &Uuid::new_v4(),
        email: &email,
        first_name: form.first_name.trim(),
        last_name: form.last_name.trim(),
        hashed_password: &hashed_password,
    };

    let user = storage
        .create_user(&values)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::debug!("Registered user {}", user.id);

    Ok(Success::created(UserResponse::from_user(&user)))
}

/// Get the current user
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/users/me
/// ```
pub async fn me<S: Storage>(current_user: CurrentUser<S>) -> Success<UserResponse> {
    Success::ok(UserResponse::from_user(&current_user))
}
