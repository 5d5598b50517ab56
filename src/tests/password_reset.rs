use axum::http::StatusCode;

use crate::tests::helper;
use crate::tests::helper::RecordingMailer;

#[tokio::test]
async fn test_password_reset() {
    let (mut app, mailer) = helper::setup_test_app();

    let access_token = helper::register_and_login(&mut app, "jane@example.com").await;

    let (status_code, sent, _) =
        helper::maybe_request_password_reset(&mut app, " JANE@example.com").await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(Some(true), sent);

    let messages = mailer.messages();
    assert_eq!(1, messages.len());
    assert_eq!("jane@example.com", messages[0].to);
    assert!(
        messages[0]
            .body
            .contains("https://journal.example.com/resetPassword?token=")
    );

    let token = RecordingMailer::token_from(&messages[0]);

    let (status_code, _) = helper::check_reset_token(&mut app, &token).await;
    assert_eq!(StatusCode::OK, status_code);

    // only a single live token at a time
    let (status_code, _, error) =
        helper::maybe_request_password_reset(&mut app, "jane@example.com").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(
        Some("A password reset link was already sent".to_string()),
        error
    );
    assert_eq!(1, mailer.messages().len());

    let (status_code, _) = helper::maybe_reset_password(&mut app, &token, "evenmoresecret").await;
    assert_eq!(StatusCode::NO_CONTENT, status_code);

    // the old session and password stop working
    let (status_code, _) = helper::current_user(&mut app, &access_token).await;
    assert_eq!(StatusCode::FORBIDDEN, status_code);

    let (status_code, _, _) =
        helper::maybe_login(&mut app, "jane@example.com", helper::PASSWORD).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);

    let (status_code, _, _) =
        helper::maybe_login(&mut app, "jane@example.com", "evenmoresecret").await;
    assert_eq!(StatusCode::OK, status_code);

    // a token can be used once
    let (status_code, error) = helper::check_reset_token(&mut app, &token).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(Some("Invalid or expired token".to_string()), error);

    let (status_code, error) = helper::maybe_reset_password(&mut app, &token, "again").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(Some("Invalid or expired token".to_string()), error);

    // a used token does not block a new one
    let (status_code, sent, _) =
        helper::maybe_request_password_reset(&mut app, "jane@example.com").await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(Some(true), sent);
}

#[tokio::test]
async fn test_password_reset_unknown_user() {
    let (mut app, mailer) = helper::setup_test_app();

    let (status_code, _, error) =
        helper::maybe_request_password_reset(&mut app, "nobody@example.com").await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!(Some("User not found".to_string()), error);
    assert!(mailer.messages().is_empty());
}

#[tokio::test]
async fn test_unknown_reset_token() {
    let (mut app, _) = helper::setup_test_app();

    let (status_code, error) = helper::check_reset_token(&mut app, "not-a-token").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(Some("Invalid or expired token".to_string()), error);

    let (status_code, error) =
        helper::maybe_reset_password(&mut app, "not-a-token", "evenmoresecret").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(Some("Invalid or expired token".to_string()), error);
}

#[tokio::test]
async fn test_reset_requires_password() {
    let (mut app, mailer) = helper::setup_test_app();

    helper::register_and_login(&mut app, "jane@example.com").await;
    helper::maybe_request_password_reset(&mut app, "jane@example.com").await;

    let token = RecordingMailer::token_from(&mailer.messages()[0]);

    let (status_code, error) = helper::maybe_reset_password(&mut app, &token, "").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(Some("Password can not be empty".to_string()), error);

    // still usable
    let (status_code, _) = helper::check_reset_token(&mut app, &token).await;
    assert_eq!(StatusCode::OK, status_code);
}
