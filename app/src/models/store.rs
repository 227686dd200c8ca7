use super::checkpoint::{self, CheckpointDao};
use super::field::{self, FieldDao};
use super::pump::{self, PumpDao};
use super::reading::{self, ReadingDao, ReplaceSummary};
use super::session::{self, SessionDao};
use super::trigger::{self, Firing, NewTrigger, TriggerDao};
use super::user::{self, UserDao};
use crate::error::DBError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use irrigo_core::{Evaluation, ReadingSample, WeatherSample};
use sqlx::PgPool;

/// Produces a fresh set of readings for one checkpoint.
pub type Sampler<'a> = &'a mut (dyn FnMut() -> Vec<ReadingSample> + Send);

/// Durable state of the service.
///
/// Every method that reads and then writes runs atomically: either in one
/// transaction or, for the in-memory store, under one lock. Reads and writes
/// of user-owned rows take the caller's `user_id` and only ever see rows
/// reachable through a field owned by that user.
#[async_trait]
pub trait Store: Send + Sync {
    async fn check_schema(&self) -> Result<(), DBError>;

    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserDao, DBError>;
    async fn user(&self, user_id: i32) -> Result<Option<UserDao>, DBError>;
    async fn user_by_name(&self, username: &str) -> Result<Option<UserDao>, DBError>;
    async fn email_taken(&self, email: &str) -> Result<bool, DBError>;

    async fn insert_session(
        &self,
        token: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DBError>;
    async fn session(&self, token: &str) -> Result<Option<SessionDao>, DBError>;
    async fn delete_session(&self, token: &str) -> Result<(), DBError>;
    async fn purge_sessions(&self, now: DateTime<Utc>) -> Result<u64, DBError>;

    async fn insert_field(&self, user_id: i32, name: &str, city: &str) -> Result<FieldDao, DBError>;
    async fn fields(&self, user_id: i32) -> Result<Vec<FieldDao>, DBError>;
    async fn field(&self, user_id: i32, field_id: i32) -> Result<Option<FieldDao>, DBError>;
    async fn field_name_taken(
        &self,
        user_id: i32,
        name: &str,
        except_id: Option<i32>,
    ) -> Result<bool, DBError>;
    async fn update_field(&self, field: &FieldDao) -> Result<bool, DBError>;
    async fn delete_field(&self, user_id: i32, field_id: i32) -> Result<bool, DBError>;

    /// Creates the checkpoint together with its readings and its pump.
    async fn insert_checkpoint(
        &self,
        field_id: i32,
        name: &str,
        readings: &[ReadingSample],
    ) -> Result<CheckpointDao, DBError>;
    async fn checkpoints(&self, field_id: i32) -> Result<Vec<CheckpointDao>, DBError>;
    async fn checkpoint(
        &self,
        user_id: i32,
        checkpoint_id: i32,
    ) -> Result<Option<CheckpointDao>, DBError>;
    async fn update_checkpoint(
        &self,
        user_id: i32,
        checkpoint: &CheckpointDao,
    ) -> Result<bool, DBError>;
    async fn delete_checkpoint(&self, user_id: i32, checkpoint_id: i32) -> Result<bool, DBError>;

    async fn readings(&self, checkpoint_id: i32) -> Result<Vec<ReadingDao>, DBError>;
    /// Overwrites the readings of every checkpoint with `sampler` output.
    async fn regenerate_readings(&self, sampler: Sampler<'_>) -> Result<ReplaceSummary, DBError>;

    async fn pump(&self, checkpoint_id: i32) -> Result<Option<PumpDao>, DBError>;
    async fn pumps(&self, user_id: i32) -> Result<Vec<PumpDao>, DBError>;
    async fn set_pump(
        &self,
        user_id: i32,
        pump_id: i32,
        is_on: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<PumpDao>, DBError>;

    async fn insert_trigger(&self, field_id: i32, new: &NewTrigger) -> Result<TriggerDao, DBError>;
    async fn triggers(&self, user_id: i32, field_id: Option<i32>) -> Result<Vec<TriggerDao>, DBError>;
    async fn trigger(&self, user_id: i32, trigger_id: i32) -> Result<Option<TriggerDao>, DBError>;
    async fn update_trigger(&self, user_id: i32, trigger: &TriggerDao) -> Result<bool, DBError>;
    async fn delete_trigger(&self, user_id: i32, trigger_id: i32) -> Result<bool, DBError>;
    /// Evaluates the trigger task against `sample` while holding it. If the
    /// rule fires, every pump of its field is driven to the action's state
    /// and `last_triggered` is stamped, all in the same transaction.
    /// `None` if the task does not exist or is not owned by `user_id`.
    async fn evaluate_trigger(
        &self,
        user_id: i32,
        trigger_id: i32,
        sample: &WeatherSample,
        now: DateTime<Utc>,
    ) -> Result<Option<Firing>, DBError>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn check_schema(&self) -> Result<(), DBError> {
        super::check_schema(&self.pool).await
    }

    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserDao, DBError> {
        let mut conn = self.pool.acquire().await?;
        user::insert(&mut conn, username, email, password_hash).await
    }

    async fn user(&self, user_id: i32) -> Result<Option<UserDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        user::get(&mut conn, user_id).await
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<UserDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        user::get_by_name(&mut conn, username).await
    }

    async fn email_taken(&self, email: &str) -> Result<bool, DBError> {
        let mut conn = self.pool.acquire().await?;
        user::exists_with_email(&mut conn, email).await
    }

    async fn insert_session(
        &self,
        token: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DBError> {
        let mut conn = self.pool.acquire().await?;
        session::insert(&mut conn, token, user_id, expires_at).await
    }

    async fn session(&self, token: &str) -> Result<Option<SessionDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        session::get(&mut conn, token).await
    }

    async fn delete_session(&self, token: &str) -> Result<(), DBError> {
        let mut conn = self.pool.acquire().await?;
        session::delete(&mut conn, token).await
    }

    async fn purge_sessions(&self, now: DateTime<Utc>) -> Result<u64, DBError> {
        let mut conn = self.pool.acquire().await?;
        session::delete_expired(&mut conn, now).await
    }

    async fn insert_field(&self, user_id: i32, name: &str, city: &str) -> Result<FieldDao, DBError> {
        let mut conn = self.pool.acquire().await?;
        field::insert(&mut conn, user_id, name, city).await
    }

    async fn fields(&self, user_id: i32) -> Result<Vec<FieldDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        field::read(&mut conn, user_id).await
    }

    async fn field(&self, user_id: i32, field_id: i32) -> Result<Option<FieldDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        field::get(&mut conn, user_id, field_id).await
    }

    async fn field_name_taken(
        &self,
        user_id: i32,
        name: &str,
        except_id: Option<i32>,
    ) -> Result<bool, DBError> {
        let mut conn = self.pool.acquire().await?;
        field::exists_with_name(&mut conn, user_id, name, except_id).await
    }

    async fn update_field(&self, field: &FieldDao) -> Result<bool, DBError> {
        let mut conn = self.pool.acquire().await?;
        field::update(&mut conn, field).await
    }

    async fn delete_field(&self, user_id: i32, field_id: i32) -> Result<bool, DBError> {
        let mut conn = self.pool.acquire().await?;
        field::delete(&mut conn, user_id, field_id).await
    }

    async fn insert_checkpoint(
        &self,
        field_id: i32,
        name: &str,
        readings: &[ReadingSample],
    ) -> Result<CheckpointDao, DBError> {
        let mut tx = self.pool.begin().await?;
        let created = checkpoint::insert(&mut tx, field_id, name).await?;
        for sample in readings {
            reading::upsert(&mut tx, created.id(), sample).await?;
        }
        pump::insert(&mut tx, created.id(), &pump::pump_name(name)).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn checkpoints(&self, field_id: i32) -> Result<Vec<CheckpointDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        checkpoint::read(&mut conn, field_id).await
    }

    async fn checkpoint(
        &self,
        user_id: i32,
        checkpoint_id: i32,
    ) -> Result<Option<CheckpointDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        checkpoint::get(&mut conn, user_id, checkpoint_id).await
    }

    async fn update_checkpoint(
        &self,
        user_id: i32,
        checkpoint: &CheckpointDao,
    ) -> Result<bool, DBError> {
        let mut conn = self.pool.acquire().await?;
        checkpoint::update(&mut conn, user_id, checkpoint).await
    }

    async fn delete_checkpoint(&self, user_id: i32, checkpoint_id: i32) -> Result<bool, DBError> {
        let mut conn = self.pool.acquire().await?;
        checkpoint::delete(&mut conn, user_id, checkpoint_id).await
    }

    async fn readings(&self, checkpoint_id: i32) -> Result<Vec<ReadingDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        reading::read(&mut conn, checkpoint_id).await
    }

    async fn regenerate_readings(&self, sampler: Sampler<'_>) -> Result<ReplaceSummary, DBError> {
        let mut tx = self.pool.begin().await?;
        let checkpoint_ids = checkpoint::lock_ids(&mut tx).await?;

        let mut summary = ReplaceSummary {
            checkpoints: checkpoint_ids.len(),
            ..Default::default()
        };
        for checkpoint_id in checkpoint_ids {
            for sample in sampler() {
                summary.record(reading::upsert(&mut tx, checkpoint_id, &sample).await?);
            }
        }
        tx.commit().await?;
        Ok(summary)
    }

    async fn pump(&self, checkpoint_id: i32) -> Result<Option<PumpDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        pump::get_for_checkpoint(&mut conn, checkpoint_id).await
    }

    async fn pumps(&self, user_id: i32) -> Result<Vec<PumpDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        pump::read(&mut conn, user_id).await
    }

    async fn set_pump(
        &self,
        user_id: i32,
        pump_id: i32,
        is_on: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<PumpDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        pump::set_state(&mut conn, user_id, pump_id, is_on, now).await
    }

    async fn insert_trigger(&self, field_id: i32, new: &NewTrigger) -> Result<TriggerDao, DBError> {
        let mut conn = self.pool.acquire().await?;
        trigger::insert(&mut conn, field_id, new).await
    }

    async fn triggers(&self, user_id: i32, field_id: Option<i32>) -> Result<Vec<TriggerDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        trigger::read(&mut conn, user_id, field_id).await
    }

    async fn trigger(&self, user_id: i32, trigger_id: i32) -> Result<Option<TriggerDao>, DBError> {
        let mut conn = self.pool.acquire().await?;
        trigger::get(&mut conn, user_id, trigger_id).await
    }

    async fn update_trigger(&self, user_id: i32, trigger: &TriggerDao) -> Result<bool, DBError> {
        let mut conn = self.pool.acquire().await?;
        trigger::update(&mut conn, user_id, trigger).await
    }

    async fn delete_trigger(&self, user_id: i32, trigger_id: i32) -> Result<bool, DBError> {
        let mut conn = self.pool.acquire().await?;
        trigger::delete(&mut conn, user_id, trigger_id).await
    }

    async fn evaluate_trigger(
        &self,
        user_id: i32,
        trigger_id: i32,
        sample: &WeatherSample,
        now: DateTime<Utc>,
    ) -> Result<Option<Firing>, DBError> {
        let mut tx = self.pool.begin().await?;
        let locked = match trigger::lock(&mut tx, user_id, trigger_id).await? {
            Some(locked) => locked,
            None => return Ok(None),
        };
        let rule = locked.rule()?;
        let evaluation = rule.evaluate(sample);

        let mut switched = 0;
        if let Ok(Evaluation::Fired { .. }) = evaluation {
            switched =
                pump::set_state_for_field(&mut tx, locked.field_id(), rule.action.pump_state(), now)
                    .await?;
            trigger::stamp_triggered(&mut tx, locked.id(), now).await?;
        }
        tx.commit().await?;

        Ok(Some(Firing {
            trigger: locked,
            evaluation,
            switched,
        }))
    }
}
