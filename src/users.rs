use anyhow::Result;
use chrono::naive::NaiveDateTime;
use uuid::Uuid;

use crate::password::generate;
use crate::password::hash;
use crate::storage::CreateUserValues;
use crate::storage::Storage;
use crate::utils::env_var_or_else;

#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub session_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub hashed_password: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    /// Name used to greet the user
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Normalize an email address for storage and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn ensure_initial_user<S: Storage>(storage: &S) -> Result<()> {
    let user = storage.find_any_single_user().await?;

    if user.is_none() {
        let email = env_var_or_else("INITIAL_EMAIL", || {
            let initial_email = format!("{}@travel-journal.local", Uuid::new_v4().simple());
            tracing::info!("`INITIAL_EMAIL` not set, generating new email: {initial_email}");
            initial_email
        });

        let password = env_var_or_else("INITIAL_PASSWORD", || {
            let initial_password = generate();
            tracing::info!(
                "`INITIAL_PASSWORD` not set, generating new password: {initial_password}"
            );
            initial_password
        });

        let hashed_password = hash(&password).map_err(|err| anyhow::anyhow!("{err}"))?;

        let values = CreateUserValues {
            session_id: &Uuid::new_v4(),
            email: &normalize_email(&email),
            first_name: "Travel",
            last_name: "Admin",
            hashed_password: &hashed_password,
        };

        storage.create_user(&values).await?;
    }

    Ok(())
}
