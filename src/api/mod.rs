//! All API endpoint setup

use axum::Router;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;

pub use current_user::CurrentUser;
pub use current_user::JwtKeys;
pub use request::Form;
pub use request::MultipartForm;
pub use request::PathParameters;
pub use response::Error;
pub use response::Success;

use crate::storage::Storage;

mod current_user;
mod files;
mod journals;
mod notes;
mod password_reset;
mod request;
mod response;
mod users;

/// Get the Axum router for all API routes
pub fn router<S: Storage>() -> Router {
    let users = Router::new()
        .route("/token", post(users::token::<S>))
        .route("/", post(users::register::<S>))
        .route("/me", get(users::me::<S>));

    let notes = Router::new()
        .route("/", get(notes::list::<S>).post(notes::create::<S>))
        .route(
            "/{note}",
            get(notes::single::<S>).put(notes::update::<S>),
        );

    let journals = Router::new()
        .route("/", get(journals::list::<S>).post(journals::create::<S>))
        .route("/{journal}", get(journals::single::<S>))
        .nest("/{journal}/notes", notes);

    let password_reset = Router::new()
        .route("/", post(password_reset::request::<S>))
        .route(
            "/{token}",
            get(password_reset::check::<S>).post(password_reset::reset::<S>),
        );

    Router::new()
        .nest("/users", users)
        .nest("/journals", journals)
        .route("/notes/{note}", delete(notes::delete::<S>))
        .route("/images/{file}", get(files::download::<S>))
        .nest("/password-reset", password_reset)
        .fallback(not_found)
}

async fn not_found() -> Error {
    Error::not_found("Not found")
}
