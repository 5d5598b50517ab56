#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]
#![doc = include_str!("../README.md")]

use std::net::SocketAddr;

use anyhow::Result;
use axum::Extension;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;
use url::Url;

use crate::api::JwtKeys;
use crate::api::router;
use crate::mailer::SharedMailer;
use crate::reset_tokens::ResetSettings;
use crate::storage::Storage;
use crate::users::ensure_initial_user;
use crate::utils::env_var_or_else;
use crate::utils::env_var_parsed_or;

mod api;
mod dates;
mod files;
mod graceful_shutdown;
mod journals;
mod mailer;
mod notes;
mod password;
mod reset_tokens;
mod storage;
#[cfg(test)]
mod tests;
mod users;
mod utils;

const DEFAULT_RUST_LOG: &str = "travel_journal=debug,tower_http=debug";
const DEFAULT_ADDRESS: &str = "0.0.0.0:6000";
const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";

/// Multipart bodies carry up to 7 photos
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let app = setup_app().await?;

    let address = setup_address()?;
    tracing::info!("Listening on {}", address);

    let listener = TcpListener::bind(address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown::handler())
        .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` if any of its dependencies fail to load:
/// - Database connection
/// - Initial user setup
/// - Mailer and reset link configuration
pub async fn setup_app() -> Result<Router> {
    let storage = storage::setup().await?;

    ensure_initial_user(&storage).await?;

    let mailer = mailer::setup()?;
    let reset_settings = setup_reset_settings()?;
    let body_limit = env_var_parsed_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

    Ok(create_router(
        storage,
        setup_jwt_keys(),
        mailer,
        reset_settings,
        body_limit,
    ))
}

/// Create the router for the travel journal
fn create_router<S: Storage>(
    storage: S,
    jwt_keys: JwtKeys,
    mailer: SharedMailer,
    reset_settings: ResetSettings,
    body_limit: usize,
) -> Router {
    Router::new()
        .nest("/api", router::<S>())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(storage))
        .layer(Extension(jwt_keys))
        .layer(Extension(mailer))
        .layer(Extension(reset_settings))
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}

fn setup_jwt_keys() -> JwtKeys {
    use crate::password::generate;

    let jwt_secret = env_var_or_else("JWT_SECRET", || {
        let jwt_secret = generate();
        tracing::info!("`JWT_SECRET` is not set, generating temporary one: {jwt_secret}");
        jwt_secret
    });

    JwtKeys::new(jwt_secret.as_bytes())
}

fn setup_reset_settings() -> Result<ResetSettings> {
    let app_base_url = env_var_or_else("APP_BASE_URL", || String::from(DEFAULT_APP_BASE_URL));

    Ok(ResetSettings {
        app_base_url: Url::parse(&app_base_url)?,
    })
}

fn setup_address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Ok(port) = std::env::var("PORT") {
        // only check non-empty strings
        if !port.is_empty() {
            let port = port.parse::<u16>()?;

            address.set_port(port);
        }
    }

    Ok(address)
}
