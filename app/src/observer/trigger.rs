use super::{validate_name, validate_threshold, ConcurrentObserver};
use crate::error::{DBError, ObserverError};
use crate::models::trigger::{NewTrigger, TriggerDao};
use crate::weather::WeatherReport;
use chrono::Utc;
use irrigo_core::{Comparison, Evaluation, TriggerAction, WeatherMetric, WeatherSample};
use std::sync::Arc;
use tracing::{debug, info};

/// Changes to a trigger task, absent values stay as they are.
#[derive(Debug, Clone, Default)]
pub struct TriggerPatch {
    pub name: Option<String>,
    pub weather_metric: Option<WeatherMetric>,
    pub condition: Option<Comparison>,
    pub threshold: Option<f64>,
    pub action: Option<TriggerAction>,
    pub is_active: Option<bool>,
}

/// What a single evaluation decided and did.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOutcome {
    pub triggered: bool,
    pub weather_value: Option<f64>,
    pub threshold: f64,
    pub message: String,
}

pub struct TriggerObserver {
    inner: Arc<ConcurrentObserver>,
}

impl Clone for TriggerObserver {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl TriggerObserver {
    pub fn new(inner: Arc<ConcurrentObserver>) -> Self {
        TriggerObserver { inner }
    }

    pub async fn list(
        &self,
        user_id: i32,
        field_id: Option<i32>,
    ) -> Result<Vec<TriggerDao>, ObserverError> {
        Ok(self.inner.store.triggers(user_id, field_id).await?)
    }

    pub async fn create(
        &self,
        user_id: i32,
        field_id: i32,
        mut new: NewTrigger,
    ) -> Result<TriggerDao, ObserverError> {
        new.name = validate_name("name", &new.name)?;
        new.threshold = validate_threshold(new.threshold)?;

        let store = &self.inner.store;
        if store.field(user_id, field_id).await?.is_none() {
            return Err(DBError::FieldNotFound(field_id).into());
        }
        let trigger = store.insert_trigger(field_id, &new).await?;
        info!(trigger_id = trigger.id(), field_id = field_id, "Created trigger task");
        Ok(trigger)
    }

    pub async fn update(
        &self,
        user_id: i32,
        trigger_id: i32,
        patch: TriggerPatch,
    ) -> Result<TriggerDao, ObserverError> {
        let store = &self.inner.store;
        let mut trigger = store
            .trigger(user_id, trigger_id)
            .await?
            .ok_or(DBError::TriggerNotFound(trigger_id))?;

        if let Some(name) = patch.name {
            trigger.name = validate_name("name", &name)?;
        }
        if let Some(metric) = patch.weather_metric {
            trigger.weather_metric = metric.as_str().to_owned();
        }
        if let Some(condition) = patch.condition {
            trigger.condition = condition.as_str().to_owned();
        }
        if let Some(threshold) = patch.threshold {
            trigger.threshold = validate_threshold(threshold)?;
        }
        if let Some(action) = patch.action {
            trigger.action = action.as_str().to_owned();
        }
        if let Some(is_active) = patch.is_active {
            trigger.is_active = is_active;
        }

        if !store.update_trigger(user_id, &trigger).await? {
            return Err(DBError::TriggerNotFound(trigger_id).into());
        }
        Ok(trigger)
    }

    pub async fn delete(&self, user_id: i32, trigger_id: i32) -> Result<(), ObserverError> {
        if !self.inner.store.delete_trigger(user_id, trigger_id).await? {
            return Err(DBError::TriggerNotFound(trigger_id).into());
        }
        info!(trigger_id = trigger_id, "Deleted trigger task");
        Ok(())
    }

    /// Evaluates a trigger task against `sample` and, if it fires, drives
    /// every pump of the task's field. Reading the task, deciding and
    /// switching happen in one transaction.
    #[tracing::instrument(skip(self, sample))]
    pub async fn evaluate(
        &self,
        user_id: i32,
        trigger_id: i32,
        sample: &WeatherSample,
    ) -> Result<TriggerOutcome, ObserverError> {
        let firing = self
            .inner
            .store
            .evaluate_trigger(user_id, trigger_id, sample, Utc::now())
            .await?
            .ok_or(DBError::TriggerNotFound(trigger_id))?;
        let trigger = &firing.trigger;

        match firing.evaluation? {
            Evaluation::Inactive => Ok(TriggerOutcome {
                triggered: false,
                weather_value: None,
                threshold: trigger.threshold(),
                message: "Trigger is not active".to_owned(),
            }),
            Evaluation::Held {
                observed,
                threshold,
            } => {
                debug!(trigger_id = trigger_id, "Condition not met");
                Ok(TriggerOutcome {
                    triggered: false,
                    weather_value: Some(observed),
                    threshold,
                    message: "Condition not met".to_owned(),
                })
            }
            Evaluation::Fired {
                observed,
                threshold,
            } => {
                let action = trigger.action().map_err(DBError::from)?;
                info!(
                    trigger_id = trigger_id,
                    field_id = trigger.field_id(),
                    "Action {} executed for {} pumps",
                    action,
                    firing.switched
                );
                Ok(TriggerOutcome {
                    triggered: true,
                    weather_value: Some(observed),
                    threshold,
                    message: format!("Action {} executed for {} pumps", action, firing.switched),
                })
            }
        }
    }

    /// Current weather for `city`, as the rules see it.
    pub async fn weather(&self, city: &str) -> Result<WeatherReport, ObserverError> {
        let city = validate_name("city", city)?;
        Ok(self.inner.weather.current(&city).await?)
    }
}
