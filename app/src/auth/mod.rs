use crate::error::{AuthError, ObserverError};
use crate::models::Store;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString},
    Argon2, PasswordHasher,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// An issued bearer token and the user it resolves to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: i32,
    pub expires_at: DateTime<Utc>,
}

/// Turns credentials into sessions and sessions back into user ids.
///
/// Everything behind the REST layer trusts the user id an `Authenticator`
/// produced; nothing else may supply one.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ObserverError>;
    async fn identify(&self, token: &str) -> Result<i32, ObserverError>;
    async fn revoke(&self, token: &str) -> Result<(), ObserverError>;
}

/// Server side sessions, keyed by an opaque uuid token.
pub struct SessionAuthenticator {
    store: Arc<dyn Store>,
    ttl: Duration,
}

impl SessionAuthenticator {
    pub fn new(store: Arc<dyn Store>, ttl: Duration) -> Self {
        SessionAuthenticator { store, ttl }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ObserverError> {
        let user = self
            .store
            .user_by_name(&credentials.username)
            .await?
            .ok_or(AuthError::BadPassword)?;
        if !verify_password(&credentials.password, user.password_hash()) {
            return Err(AuthError::BadPassword.into());
        }

        let now = Utc::now();
        let purged = self.store.purge_sessions(now).await?;
        if purged > 0 {
            debug!("Purged {} expired sessions", purged);
        }

        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id: user.id(),
            expires_at: now + self.ttl,
        };
        self.store
            .insert_session(&session.token, session.user_id, session.expires_at)
            .await?;
        info!(user_id = user.id(), "Issued session");
        Ok(session)
    }

    async fn identify(&self, token: &str) -> Result<i32, ObserverError> {
        let session = self
            .store
            .session(token)
            .await?
            .ok_or(AuthError::Invalid)?;
        if session.is_expired(Utc::now()) {
            self.store.delete_session(token).await?;
            return Err(AuthError::Expired.into());
        }
        Ok(session.user_id())
    }

    async fn revoke(&self, token: &str) -> Result<(), ObserverError> {
        self.store.delete_session(token).await?;
        Ok(())
    }
}

/// Hashes a password with argon2 and a random salt.
pub fn hash_password(password: &str) -> Result<String, ObserverError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
