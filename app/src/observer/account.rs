use super::ConcurrentObserver;
use crate::auth::{self, Credentials, Session};
use crate::error::{AuthError, DBError, ObserverError, ValidationError};
use crate::models::user::UserDao;
use std::sync::Arc;
use tracing::info;

pub struct AccountObserver {
    inner: Arc<ConcurrentObserver>,
}

impl Clone for AccountObserver {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl AccountObserver {
    pub fn new(inner: Arc<ConcurrentObserver>) -> Self {
        AccountObserver { inner }
    }

    /// Registers a new user; username and email must both be unused.
    #[tracing::instrument(skip(self, password))]
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserDao, ObserverError> {
        let username = username.trim();
        let username_len = username.chars().count();
        if !(3..=64).contains(&username_len) {
            return Err(ValidationError::new("username", "must be 3 to 64 characters").into());
        }
        let email = email.trim();
        if !email.contains('@') {
            return Err(ValidationError::new("email", "must be an email address").into());
        }
        if password.chars().count() < 6 {
            return Err(ValidationError::new("password", "must be at least 6 characters").into());
        }

        let store = &self.inner.store;
        if store.user_by_name(username).await?.is_some() {
            return Err(DBError::Duplicate(format!("Username {}", username)).into());
        }
        if store.email_taken(email).await? {
            return Err(DBError::Duplicate(format!("Email {}", email)).into());
        }

        let hash = auth::hash_password(password)?;
        let user = store.insert_user(username, email, &hash).await?;
        info!(user_id = user.id(), "Registered user");
        Ok(user)
    }

    pub async fn login(&self, username: String, password: String) -> Result<Session, ObserverError> {
        let credentials = Credentials { username, password };
        self.inner.authenticator.authenticate(&credentials).await
    }

    pub async fn logout(&self, token: &str) -> Result<(), ObserverError> {
        self.inner.authenticator.revoke(token).await
    }

    /// Resolves a bearer token to the user id it was issued for.
    pub async fn identify(&self, token: &str) -> Result<i32, ObserverError> {
        self.inner.authenticator.identify(token).await
    }

    pub async fn me(&self, user_id: i32) -> Result<UserDao, ObserverError> {
        self.inner
            .store
            .user(user_id)
            .await?
            .ok_or_else(|| AuthError::Invalid.into())
    }
}
