//! Password reset tokens
//!
//! A token is a random opaque string mailed to the user as part of a link. It can be used
//! once, within 30 minutes after it was issued.

use chrono::Duration;
use chrono::Utc;
use chrono::naive::NaiveDateTime;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::mailer::MailMessage;
use crate::mailer::Mailer;
use crate::password::hash;
use crate::storage;
use crate::storage::ChangePasswordValues;
use crate::storage::CreateResetTokenValues;
use crate::storage::Storage;
use crate::users::User;

/// How long a token stays valid after it is issued
pub const RESET_TOKEN_VALIDITY_MINUTES: i64 = 30;

/// Path of the reset page in the front-end, relative to the application base URL
const RESET_PAGE: &str = "resetPassword";

#[derive(Clone, Debug)]
pub struct ResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub used: bool,
    pub created_at: NaiveDateTime,
}

impl ResetToken {
    /// Can the token still be used at the given moment
    ///
    /// The expiry moment itself is still valid
    pub fn is_consumable_at(&self, now: NaiveDateTime) -> bool {
        !self.used && now <= self.expires_at
    }
}

/// Settings for the reset mails
#[derive(Clone, Debug)]
pub struct ResetSettings {
    /// Base URL of the front-end, the reset link points there
    pub app_base_url: Url,
}

impl ResetSettings {
    /// Link to the reset page for a token
    pub fn reset_link(&self, token: &str) -> Option<Url> {
        let mut link = self.app_base_url.clone();

        link.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(RESET_PAGE);
        link.query_pairs_mut().clear().append_pair("token", token);

        Some(link)
    }
}

/// Failures when consuming a token
#[derive(Debug, Error)]
pub enum ResetError {
    /// The token or the new password is not acceptable
    #[error("{0}")]
    BadRequest(String),

    /// The new password could not be hashed
    #[error("Could not hash password: {0}")]
    Password(String),

    /// The storage failed
    #[error(transparent)]
    Storage(#[from] storage::Error),
}

/// Issues, mails, validates and consumes reset tokens
pub struct ResetTokenManager<'a, S: Storage> {
    storage: &'a S,
    mailer: &'a dyn Mailer,
    settings: &'a ResetSettings,
}

impl<'a, S: Storage> ResetTokenManager<'a, S> {
    pub fn new(storage: &'a S, mailer: &'a dyn Mailer, settings: &'a ResetSettings) -> Self {
        Self {
            storage,
            mailer,
            settings,
        }
    }

    /// Issue a new token and mail it to the user
    ///
    /// The token is only saved when the mail went out. Nothing is propagated, any failure
    /// results in `false`.
    pub async fn request_reset(&self, user: &User) -> bool {
        match self.try_request_reset(user).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("Could not send password reset to user {}: {err}", user.id);

                false
            }
        }
    }

    async fn try_request_reset(&self, user: &User) -> anyhow::Result<()> {
        let token = Uuid::new_v4().to_string();
        let expires_at =
            Utc::now().naive_utc() + Duration::minutes(RESET_TOKEN_VALIDITY_MINUTES);

        let link = self
            .settings
            .reset_link(&token)
            .ok_or_else(|| anyhow::anyhow!("Application base URL can not hold a path"))?;

        let message = MailMessage {
            to: user.email.clone(),
            subject: "Reset Password".to_string(),
            body: format!(
                "Hello {}\n\n\
                Please click on this link to reset your password: {link}\n\n\
                This link will automatically expire at {} UTC",
                user.full_name(),
                expires_at.format("%H:%M:%S"),
            ),
        };

        self.mailer.send(&message).await?;

        let values = CreateResetTokenValues {
            user,
            token: &token,
            expires_at: &expires_at,
        };

        self.storage.create_reset_token(&values).await?;

        tracing::debug!("Password reset mailed to user {}", user.id);

        Ok(())
    }

    /// Find a token by its opaque value
    pub async fn lookup_token(&self, token: &str) -> Option<ResetToken> {
        match self.storage.find_single_reset_token(token).await {
            Ok(reset_token) => reset_token,
            Err(err) => {
                tracing::error!("Could not look up reset token: {err}");

                None
            }
        }
    }

    /// Can the token be used right now
    pub fn is_consumable(&self, token: Option<&ResetToken>) -> bool {
        token.is_some_and(|token| token.is_consumable_at(Utc::now().naive_utc()))
    }

    /// May the user get a new token
    ///
    /// Not while an earlier token can still be used
    pub async fn can_issue_new_token(&self, user: &User) -> storage::Result<bool> {
        let tokens = self.storage.find_all_reset_tokens_by_user(user).await?;
        let now = Utc::now().naive_utc();

        for token in &tokens {
            if token.is_consumable_at(now) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Use a token to set a new password
    ///
    /// The token is claimed before the password changes, concurrent requests with the same
    /// token see a single success. Existing sessions of the user are invalidated.
    pub async fn consume_token(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<User, ResetError> {
        let reset_token = self.lookup_token(token).await;

        let Some(reset_token) = reset_token.filter(|t| self.is_consumable(Some(t))) else {
            return Err(invalid_token());
        };

        if new_password.is_empty() {
            return Err(ResetError::BadRequest("Password can not be empty".to_string()));
        }

        let user = self
            .storage
            .find_single_user_by_id(&reset_token.user_id)
            .await?
            .ok_or_else(invalid_token)?;

        let hashed_password =
            hash(new_password).map_err(|err| ResetError::Password(err.to_string()))?;

        self.storage
            .mark_reset_token_used(&reset_token, &Utc::now().naive_utc())
            .await?
            .ok_or_else(invalid_token)?;

        let values = ChangePasswordValues {
            session_id: &Uuid::new_v4(),
            hashed_password: &hashed_password,
        };

        let user = self.storage.change_password(&user, &values).await?;

        tracing::debug!("Password of user {} reset", user.id);

        Ok(user)
    }
}

fn invalid_token() -> ResetError {
    ResetError::BadRequest("Invalid or expired token".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify;
    use crate::storage::CreateUserValues;
    use crate::storage::Memory;
    use crate::tests::helper::RecordingMailer;

    fn settings() -> ResetSettings {
        ResetSettings {
            app_base_url: Url::parse("https://journal.example.com/app/").unwrap(),
        }
    }

    async fn setup() -> (Memory, User) {
        let storage = Memory::new();

        let user = storage
            .create_user(&CreateUserValues {
                session_id: &Uuid::new_v4(),
                email: "jane@example.com",
                first_name: "Jane",
                last_name: "Doe",
                hashed_password: "not-a-hash",
            })
            .await
            .unwrap();

        (storage, user)
    }

    fn token(expires_at: NaiveDateTime, used: bool) -> ResetToken {
        ResetToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: Uuid::new_v4().to_string(),
            expires_at,
            used,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_is_consumable_at() {
        let now = Utc::now().naive_utc();

        assert!(token(now + Duration::minutes(1), false).is_consumable_at(now));
        assert!(token(now, false).is_consumable_at(now));
        assert!(!token(now - Duration::seconds(1), false).is_consumable_at(now));
        assert!(!token(now + Duration::minutes(1), true).is_consumable_at(now));
    }

    #[test]
    fn test_reset_link() {
        let link = settings().reset_link("abc-123").unwrap();
        assert_eq!(
            "https://journal.example.com/app/resetPassword?token=abc-123",
            link.as_str()
        );

        let settings = ResetSettings {
            app_base_url: Url::parse("http://localhost:3000").unwrap(),
        };
        let link = settings.reset_link("abc-123").unwrap();
        assert_eq!("http://localhost:3000/resetPassword?token=abc-123", link.as_str());
    }

    #[tokio::test]
    async fn test_request_reset_mails_and_saves_token() {
        let (storage, user) = setup().await;
        let mailer = RecordingMailer::new();
        let settings = settings();
        let manager = ResetTokenManager::new(&storage, &mailer, &settings);

        assert!(manager.can_issue_new_token(&user).await.unwrap());
        assert!(manager.request_reset(&user).await);

        let messages = mailer.messages();
        assert_eq!(1, messages.len());
        assert_eq!("jane@example.com", messages[0].to);
        assert!(messages[0].body.starts_with("Hello Jane Doe"));

        let token = RecordingMailer::token_from(&messages[0]);
        let reset_token = manager.lookup_token(&token).await;
        assert!(manager.is_consumable(reset_token.as_ref()));

        // a live token blocks new ones
        assert!(!manager.can_issue_new_token(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_mail_saves_nothing() {
        let (storage, user) = setup().await;
        let mailer = RecordingMailer::failing();
        let settings = settings();
        let manager = ResetTokenManager::new(&storage, &mailer, &settings);

        assert!(!manager.request_reset(&user).await);
        assert!(
            storage
                .find_all_reset_tokens_by_user(&user)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(manager.can_issue_new_token(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_token_is_consumable_once() {
        let (storage, user) = setup().await;
        let mailer = RecordingMailer::new();
        let settings = settings();
        let manager = ResetTokenManager::new(&storage, &mailer, &settings);

        assert!(manager.request_reset(&user).await);
        let token = RecordingMailer::token_from(&mailer.messages()[0]);

        let updated_user = manager.consume_token(&token, "newsecret").await.unwrap();
        assert!(verify(&updated_user.hashed_password, "newsecret"));
        assert_ne!(user.session_id, updated_user.session_id);

        let reset_token = manager.lookup_token(&token).await;
        assert!(reset_token.as_ref().is_some_and(|t| t.used));
        assert!(!manager.is_consumable(reset_token.as_ref()));

        let result = manager.consume_token(&token, "othersecret").await;
        assert!(matches!(result, Err(ResetError::BadRequest(_))));

        // used tokens no longer block
        assert!(manager.can_issue_new_token(&user).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_consumption() {
        let (storage, user) = setup().await;
        let mailer = RecordingMailer::new();
        let settings = settings();

        assert!(
            ResetTokenManager::new(&storage, &mailer, &settings)
                .request_reset(&user)
                .await
        );
        let token = RecordingMailer::token_from(&mailer.messages()[0]);

        let handles = ["firstsecret", "secondsecret"].map(|password| {
            let storage = storage.clone();
            let mailer = mailer.clone();
            let settings = settings.clone();
            let token = token.clone();

            tokio::spawn(async move {
                ResetTokenManager::new(&storage, &mailer, &settings)
                    .consume_token(&token, password)
                    .await
                    .is_ok()
            })
        });

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(1, successes);
    }

    #[tokio::test]
    async fn test_claim_used_token() {
        let (storage, user) = setup().await;
        let expires_at = Utc::now().naive_utc() + Duration::minutes(5);

        let reset_token = storage
            .create_reset_token(&CreateResetTokenValues {
                user: &user,
                token: "claim-me",
                expires_at: &expires_at,
            })
            .await
            .unwrap();

        let now = Utc::now().naive_utc();
        let claimed = storage.mark_reset_token_used(&reset_token, &now).await.unwrap();
        assert!(claimed.is_some_and(|t| t.used));

        let claimed = storage.mark_reset_token_used(&reset_token, &now).await.unwrap();
        assert!(claimed.is_none());

        // expired tokens can not be claimed
        let late = expires_at + Duration::seconds(1);
        let other_token = storage
            .create_reset_token(&CreateResetTokenValues {
                user: &user,
                token: "too-late",
                expires_at: &expires_at,
            })
            .await
            .unwrap();
        let claimed = storage.mark_reset_token_used(&other_token, &late).await.unwrap();
        assert!(claimed.is_none());
    }

    #[tokio::test]
    async fn test_expired_token() {
        let (storage, user) = setup().await;
        let mailer = RecordingMailer::new();
        let settings = settings();
        let manager = ResetTokenManager::new(&storage, &mailer, &settings);

        let expires_at = Utc::now().naive_utc() - Duration::minutes(1);
        storage
            .create_reset_token(&CreateResetTokenValues {
                user: &user,
                token: "expired",
                expires_at: &expires_at,
            })
            .await
            .unwrap();

        let reset_token = manager.lookup_token("expired").await;
        assert!(reset_token.is_some());
        assert!(!manager.is_consumable(reset_token.as_ref()));
        assert!(manager.can_issue_new_token(&user).await.unwrap());

        let result = manager.consume_token("expired", "newsecret").await;
        assert!(matches!(result, Err(ResetError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (storage, _) = setup().await;
        let mailer = RecordingMailer::new();
        let settings = settings();
        let manager = ResetTokenManager::new(&storage, &mailer, &settings);

        assert!(manager.lookup_token("unknown").await.is_none());
        assert!(!manager.is_consumable(None));
    }

    #[tokio::test]
    async fn test_empty_password() {
        let (storage, user) = setup().await;
        let mailer = RecordingMailer::new();
        let settings = settings();
        let manager = ResetTokenManager::new(&storage, &mailer, &settings);

        assert!(manager.request_reset(&user).await);
        let token = RecordingMailer::token_from(&mailer.messages()[0]);

        let result = manager.consume_token(&token, "").await;
        assert!(matches!(result, Err(ResetError::BadRequest(_))));

        // still usable
        assert!(manager.is_consumable(manager.lookup_token(&token).await.as_ref()));
    }
}
