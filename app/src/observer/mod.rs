use crate::auth::Authenticator;
use crate::error::{DBError, ValidationError};
use crate::models::Store;
use crate::weather::WeatherProvider;
use std::fmt::Debug;
use std::sync::Arc;

pub mod account;
pub mod field;
pub mod pump;
pub mod trigger;

#[cfg(test)]
mod test;

pub use account::AccountObserver;
pub use field::FieldObserver;
pub use pump::PumpObserver;
pub use trigger::TriggerObserver;

const MAX_NAME_LEN: usize = 255;

/// Shared state behind every facade observer.
pub struct ConcurrentObserver {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) weather: Arc<dyn WeatherProvider>,
    pub(crate) authenticator: Arc<dyn Authenticator>,
}

impl Debug for ConcurrentObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentObserver").finish()
    }
}

impl ConcurrentObserver {
    pub fn new(
        store: Arc<dyn Store>,
        weather: Arc<dyn WeatherProvider>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Arc<Self> {
        Arc::new(ConcurrentObserver {
            store,
            weather,
            authenticator,
        })
    }

    pub async fn check_db(&self) -> Result<(), DBError> {
        self.store.check_schema().await
    }
}

/// Trims `value` and checks it is a usable display name.
pub(crate) fn validate_name(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    Ok(trimmed.to_owned())
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<f64, ValidationError> {
    if !threshold.is_finite() {
        return Err(ValidationError::new("threshold", "must be a finite number"));
    }
    Ok(threshold)
}
