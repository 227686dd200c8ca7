use irrigo_core::error::RuleError;
use std::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DBError {
    #[error(transparent)]
    SQLError(sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Field not found: {0}")]
    FieldNotFound(i32),
    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(i32),
    #[error("Pump not found: {0}")]
    PumpNotFound(i32),
    #[error("Trigger task not found: {0}")]
    TriggerNotFound(i32),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("Corrupt row: {0}")]
    Corrupt(#[from] RuleError),
}

impl From<sqlx::Error> for DBError {
    /// Unique violations lost a race against the duplicate check and are
    /// reported like it.
    fn from(err: sqlx::Error) -> Self {
        let duplicate = match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                Some(match db_err.constraint() {
                    Some("users_username_key") => "Username",
                    Some("users_email_key") => "Email",
                    Some("fields_user_id_name_key") => "Field",
                    _ => "Record",
                })
            }
            _ => None,
        };
        match duplicate {
            Some(what) => DBError::Duplicate(what.to_owned()),
            None => DBError::SQLError(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    Missing,
    #[error("Could not validate credentials")]
    Invalid,
    #[error("Session expired")]
    Expired,
    #[error("Incorrect username or password")]
    BadPassword,
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather service unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("Weather service rejected the request with status {0}")]
    Rejected(u16),
    #[error("Weather service returned an unexpected payload: {0}")]
    Payload(String),
}

#[derive(Debug, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        ValidationError {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    #[error("{0}")]
    NotFound(Box<dyn error::Error + Send + Sync>),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    User(Box<dyn error::Error + Send + Sync>),
    #[error(transparent)]
    Unavailable(#[from] WeatherError),
    #[error("{0}")]
    Internal(Box<dyn error::Error + Send + Sync>),
}

impl From<DBError> for ObserverError {
    fn from(err: DBError) -> Self {
        match err {
            DBError::FieldNotFound(_)
            | DBError::CheckpointNotFound(_)
            | DBError::PumpNotFound(_)
            | DBError::TriggerNotFound(_) => ObserverError::NotFound(Box::from(err)),
            DBError::Duplicate(_) => ObserverError::User(Box::from(err)),
            DBError::SQLError(_) | DBError::Migration(_) | DBError::Corrupt(_) => {
                ObserverError::Internal(Box::from(err))
            }
        }
    }
}

impl From<RuleError> for ObserverError {
    fn from(err: RuleError) -> Self {
        ObserverError::User(Box::from(err))
    }
}

impl From<argon2::password_hash::Error> for ObserverError {
    fn from(err: argon2::password_hash::Error) -> Self {
        ObserverError::Internal(err.to_string().into())
    }
}
