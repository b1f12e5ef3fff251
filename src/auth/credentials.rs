use tracing::{info, warn};

use super::password::{hash_password, verify_dummy, verify_password};
use super::repo::UserRepositoryPtr;
use super::repo_types::User;
use crate::error::{AppError, AppResult};

const INVALID_CREDENTIALS: &str = "invalid credentials";

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registers users and checks their passwords.
#[derive(Clone)]
pub struct CredentialStore {
    users: UserRepositoryPtr,
}

impl CredentialStore {
    pub fn new(users: UserRepositoryPtr) -> Self {
        Self { users }
    }

    /// Create a user, failing with `Conflict` if the email is taken.
    pub async fn create_user(&self, username: &str, email: &str, password: &str) -> AppResult<User> {
        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("email already registered".into()));
        }

        let hash = hash_password(password)?;
        let user = self
            .users
            .create(username, &email, &hash)
            .await?
            .ok_or_else(|| {
                warn!(email = %email, "email registered concurrently");
                AppError::Conflict("email already registered".into())
            })?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Look up `email` and check `password`. Unknown email and wrong password
    /// fail identically.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> AppResult<User> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            verify_dummy(password);
            warn!(email = %email, "login unknown email");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }
}
