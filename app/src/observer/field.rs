use super::{validate_name, ConcurrentObserver};
use crate::error::{DBError, ObserverError};
use crate::models::{
    checkpoint::CheckpointDao, field::FieldDao, pump::PumpDao, reading::ReadingDao,
};
use chrono::Utc;
use irrigo_core::ReadingSample;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_CITY: &str = "Dublin";

/// A field with everything that hangs below it.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub field: FieldDao,
    pub checkpoints: Vec<CheckpointView>,
}

#[derive(Debug, Clone)]
pub struct CheckpointView {
    pub checkpoint: CheckpointDao,
    pub readings: Vec<ReadingDao>,
    pub pump: Option<PumpDao>,
}

pub struct FieldObserver {
    inner: Arc<ConcurrentObserver>,
}

impl Clone for FieldObserver {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl FieldObserver {
    pub fn new(inner: Arc<ConcurrentObserver>) -> Self {
        FieldObserver { inner }
    }

    pub async fn list(&self, user_id: i32) -> Result<Vec<FieldView>, ObserverError> {
        let store = &self.inner.store;
        let mut views = Vec::new();
        for field in store.fields(user_id).await? {
            let mut checkpoints = Vec::new();
            for checkpoint in store.checkpoints(field.id()).await? {
                let readings = store.readings(checkpoint.id()).await?;
                let pump = store.pump(checkpoint.id()).await?;
                checkpoints.push(CheckpointView {
                    checkpoint,
                    readings,
                    pump,
                });
            }
            views.push(FieldView { field, checkpoints });
        }
        Ok(views)
    }

    pub async fn create(
        &self,
        user_id: i32,
        name: &str,
        city: Option<&str>,
    ) -> Result<FieldDao, ObserverError> {
        let name = validate_name("name", name)?;
        let city = validate_name("city", city.unwrap_or(DEFAULT_CITY))?;

        let store = &self.inner.store;
        if store.field_name_taken(user_id, &name, None).await? {
            return Err(DBError::Duplicate(format!("Field {}", name)).into());
        }
        let field = store.insert_field(user_id, &name, &city).await?;
        info!(field_id = field.id(), user_id = user_id, "Created field");
        Ok(field)
    }

    /// Applies the given changes, leaving absent ones untouched.
    pub async fn update(
        &self,
        user_id: i32,
        field_id: i32,
        name: Option<&str>,
        city: Option<&str>,
    ) -> Result<FieldDao, ObserverError> {
        let store = &self.inner.store;
        let mut field = store
            .field(user_id, field_id)
            .await?
            .ok_or(DBError::FieldNotFound(field_id))?;

        if let Some(name) = name {
            let name = validate_name("name", name)?;
            if store.field_name_taken(user_id, &name, Some(field_id)).await? {
                return Err(DBError::Duplicate(format!("Field {}", name)).into());
            }
            field.name = name;
        }
        if let Some(city) = city {
            field.city = validate_name("city", city)?;
        }

        if !store.update_field(&field).await? {
            return Err(DBError::FieldNotFound(field_id).into());
        }
        Ok(field)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, user_id: i32, field_id: i32) -> Result<(), ObserverError> {
        if !self.inner.store.delete_field(user_id, field_id).await? {
            return Err(DBError::FieldNotFound(field_id).into());
        }
        info!(field_id = field_id, "Deleted field");
        Ok(())
    }

    /// Creates a checkpoint below an owned field, together with its first
    /// readings and its pump.
    pub async fn create_checkpoint(
        &self,
        user_id: i32,
        field_id: i32,
        name: &str,
    ) -> Result<CheckpointDao, ObserverError> {
        let name = validate_name("name", name)?;
        let store = &self.inner.store;
        if store.field(user_id, field_id).await?.is_none() {
            return Err(DBError::FieldNotFound(field_id).into());
        }

        let samples = ReadingSample::generate(&mut rand::thread_rng(), Utc::now());
        let checkpoint = store.insert_checkpoint(field_id, &name, &samples).await?;
        info!(checkpoint_id = checkpoint.id(), field_id = field_id, "Created checkpoint");
        Ok(checkpoint)
    }

    pub async fn rename_checkpoint(
        &self,
        user_id: i32,
        checkpoint_id: i32,
        name: Option<&str>,
    ) -> Result<CheckpointDao, ObserverError> {
        let store = &self.inner.store;
        let mut checkpoint = store
            .checkpoint(user_id, checkpoint_id)
            .await?
            .ok_or(DBError::CheckpointNotFound(checkpoint_id))?;

        if let Some(name) = name {
            checkpoint.name = validate_name("name", name)?;
            if !store.update_checkpoint(user_id, &checkpoint).await? {
                return Err(DBError::CheckpointNotFound(checkpoint_id).into());
            }
        }
        Ok(checkpoint)
    }

    pub async fn delete_checkpoint(
        &self,
        user_id: i32,
        checkpoint_id: i32,
    ) -> Result<(), ObserverError> {
        if !self
            .inner
            .store
            .delete_checkpoint(user_id, checkpoint_id)
            .await?
        {
            return Err(DBError::CheckpointNotFound(checkpoint_id).into());
        }
        info!(checkpoint_id = checkpoint_id, "Deleted checkpoint");
        Ok(())
    }
}
