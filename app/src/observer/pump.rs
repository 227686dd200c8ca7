use super::ConcurrentObserver;
use crate::error::{DBError, ObserverError};
use crate::models::pump::PumpDao;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub struct PumpObserver {
    inner: Arc<ConcurrentObserver>,
}

impl Clone for PumpObserver {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl PumpObserver {
    pub fn new(inner: Arc<ConcurrentObserver>) -> Self {
        PumpObserver { inner }
    }

    pub async fn list(&self, user_id: i32) -> Result<Vec<PumpDao>, ObserverError> {
        Ok(self.inner.store.pumps(user_id).await?)
    }

    /// Switches one pump; turning it on stamps `last_activated`.
    #[tracing::instrument(skip(self))]
    pub async fn control(
        &self,
        user_id: i32,
        pump_id: i32,
        is_on: bool,
    ) -> Result<PumpDao, ObserverError> {
        let pump = self
            .inner
            .store
            .set_pump(user_id, pump_id, is_on, Utc::now())
            .await?
            .ok_or(DBError::PumpNotFound(pump_id))?;
        info!(pump_id = pump_id, is_on = is_on, "Switched pump");
        Ok(pump)
    }
}
