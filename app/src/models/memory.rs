use super::checkpoint::CheckpointDao;
use super::field::FieldDao;
use super::pump::{self, PumpDao};
use super::reading::{ReadingDao, ReplaceSummary, Upserted};
use super::session::SessionDao;
use super::store::{Sampler, Store};
use super::trigger::{Firing, NewTrigger, TriggerDao};
use super::user::UserDao;
use crate::error::DBError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use irrigo_core::{Evaluation, ReadingSample, WeatherSample};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Tables {
    next_id: i32,
    users: Vec<UserDao>,
    sessions: Vec<SessionDao>,
    fields: Vec<FieldDao>,
    checkpoints: Vec<CheckpointDao>,
    readings: Vec<ReadingDao>,
    pumps: Vec<PumpDao>,
    triggers: Vec<TriggerDao>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn owns_field(&self, user_id: i32, field_id: i32) -> bool {
        self.fields
            .iter()
            .any(|f| f.id == field_id && f.user_id == user_id)
    }

    fn owns_checkpoint(&self, user_id: i32, checkpoint_id: i32) -> bool {
        self.checkpoints
            .iter()
            .any(|c| c.id == checkpoint_id && self.owns_field(user_id, c.field_id))
    }

    fn upsert_reading(&mut self, checkpoint_id: i32, sample: &ReadingSample) -> Upserted {
        let metric = sample.metric.as_str();
        if let Some(reading) = self
            .readings
            .iter_mut()
            .find(|r| r.checkpoint_id == checkpoint_id && r.metric == metric)
        {
            reading.value = sample.value;
            reading.unit = sample.unit().to_owned();
            reading.timestamp = sample.timestamp;
            return Upserted::Updated;
        }

        let id = self.next_id();
        self.readings.push(ReadingDao {
            id,
            checkpoint_id,
            metric: metric.to_owned(),
            value: sample.value,
            unit: sample.unit().to_owned(),
            timestamp: sample.timestamp,
        });
        Upserted::Created
    }

    fn remove_checkpoint(&mut self, checkpoint_id: i32) {
        self.checkpoints.retain(|c| c.id != checkpoint_id);
        self.readings.retain(|r| r.checkpoint_id != checkpoint_id);
        self.pumps.retain(|p| p.checkpoint_id != checkpoint_id);
    }
}

/// Store kept in process memory, mirroring the cascades and ownership
/// rules of the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing_regenerations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// The next `passes` calls of `regenerate_readings` fail without
    /// touching any reading.
    pub fn fail_next_regenerations(&self, passes: usize) {
        self.failing_regenerations.store(passes, Ordering::SeqCst);
    }

    pub fn pending_failures(&self) -> usize {
        self.failing_regenerations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn check_schema(&self) -> Result<(), DBError> {
        Ok(())
    }

    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserDao, DBError> {
        let mut tables = self.tables.lock();
        if tables.users.iter().any(|u| u.username == username) {
            return Err(DBError::Duplicate(format!("User {}", username)));
        }
        let id = tables.next_id();
        let user = UserDao {
            id,
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn user(&self, user_id: i32) -> Result<Option<UserDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<UserDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn email_taken(&self, email: &str) -> Result<bool, DBError> {
        let tables = self.tables.lock();
        Ok(tables.users.iter().any(|u| u.email == email))
    }

    async fn insert_session(
        &self,
        token: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DBError> {
        let mut tables = self.tables.lock();
        tables.sessions.push(SessionDao {
            token: token.to_owned(),
            user_id,
            created_at: Utc::now(),
            expires_at,
        });
        Ok(())
    }

    async fn session(&self, token: &str) -> Result<Option<SessionDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables.sessions.iter().find(|s| s.token == token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<(), DBError> {
        self.tables.lock().sessions.retain(|s| s.token != token);
        Ok(())
    }

    async fn purge_sessions(&self, now: DateTime<Utc>) -> Result<u64, DBError> {
        let mut tables = self.tables.lock();
        let before = tables.sessions.len();
        tables.sessions.retain(|s| !s.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn insert_field(&self, user_id: i32, name: &str, city: &str) -> Result<FieldDao, DBError> {
        let mut tables = self.tables.lock();
        if tables
            .fields
            .iter()
            .any(|f| f.user_id == user_id && f.name == name)
        {
            return Err(DBError::Duplicate(format!("Field {}", name)));
        }
        let id = tables.next_id();
        let field = FieldDao {
            id,
            user_id,
            name: name.to_owned(),
            city: city.to_owned(),
            created_at: Utc::now(),
        };
        tables.fields.push(field.clone());
        Ok(field)
    }

    async fn fields(&self, user_id: i32) -> Result<Vec<FieldDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables
            .fields
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn field(&self, user_id: i32, field_id: i32) -> Result<Option<FieldDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables
            .fields
            .iter()
            .find(|f| f.id == field_id && f.user_id == user_id)
            .cloned())
    }

    async fn field_name_taken(
        &self,
        user_id: i32,
        name: &str,
        except_id: Option<i32>,
    ) -> Result<bool, DBError> {
        let tables = self.tables.lock();
        Ok(tables
            .fields
            .iter()
            .any(|f| f.user_id == user_id && f.name == name && Some(f.id) != except_id))
    }

    async fn update_field(&self, field: &FieldDao) -> Result<bool, DBError> {
        let mut tables = self.tables.lock();
        match tables
            .fields
            .iter_mut()
            .find(|f| f.id == field.id && f.user_id == field.user_id)
        {
            Some(stored) => {
                stored.name = field.name.clone();
                stored.city = field.city.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_field(&self, user_id: i32, field_id: i32) -> Result<bool, DBError> {
        let mut tables = self.tables.lock();
        if !tables.owns_field(user_id, field_id) {
            return Ok(false);
        }
        let checkpoint_ids: Vec<i32> = tables
            .checkpoints
            .iter()
            .filter(|c| c.field_id == field_id)
            .map(|c| c.id)
            .collect();
        for checkpoint_id in checkpoint_ids {
            tables.remove_checkpoint(checkpoint_id);
        }
        tables.triggers.retain(|t| t.field_id != field_id);
        tables.fields.retain(|f| f.id != field_id);
        Ok(true)
    }

    async fn insert_checkpoint(
        &self,
        field_id: i32,
        name: &str,
        readings: &[ReadingSample],
    ) -> Result<CheckpointDao, DBError> {
        let mut tables = self.tables.lock();
        if !tables.fields.iter().any(|f| f.id == field_id) {
            return Err(DBError::FieldNotFound(field_id));
        }
        let id = tables.next_id();
        let checkpoint = CheckpointDao {
            id,
            field_id,
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        tables.checkpoints.push(checkpoint.clone());
        for sample in readings {
            tables.upsert_reading(id, sample);
        }
        let pump_id = tables.next_id();
        tables.pumps.push(PumpDao {
            id: pump_id,
            checkpoint_id: id,
            name: pump::pump_name(name),
            is_on: false,
            last_activated: None,
            created_at: Utc::now(),
        });
        Ok(checkpoint)
    }

    async fn checkpoints(&self, field_id: i32) -> Result<Vec<CheckpointDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables
            .checkpoints
            .iter()
            .filter(|c| c.field_id == field_id)
            .cloned()
            .collect())
    }

    async fn checkpoint(
        &self,
        user_id: i32,
        checkpoint_id: i32,
    ) -> Result<Option<CheckpointDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables
            .checkpoints
            .iter()
            .find(|c| c.id == checkpoint_id && tables.owns_field(user_id, c.field_id))
            .cloned())
    }

    async fn update_checkpoint(
        &self,
        user_id: i32,
        checkpoint: &CheckpointDao,
    ) -> Result<bool, DBError> {
        let mut tables = self.tables.lock();
        if !tables.owns_checkpoint(user_id, checkpoint.id) {
            return Ok(false);
        }
        if let Some(stored) = tables.checkpoints.iter_mut().find(|c| c.id == checkpoint.id) {
            stored.name = checkpoint.name.clone();
        }
        Ok(true)
    }

    async fn delete_checkpoint(&self, user_id: i32, checkpoint_id: i32) -> Result<bool, DBError> {
        let mut tables = self.tables.lock();
        if !tables.owns_checkpoint(user_id, checkpoint_id) {
            return Ok(false);
        }
        tables.remove_checkpoint(checkpoint_id);
        Ok(true)
    }

    async fn readings(&self, checkpoint_id: i32) -> Result<Vec<ReadingDao>, DBError> {
        let tables = self.tables.lock();
        let mut readings: Vec<ReadingDao> = tables
            .readings
            .iter()
            .filter(|r| r.checkpoint_id == checkpoint_id)
            .cloned()
            .collect();
        readings.sort_by(|a, b| a.metric.cmp(&b.metric));
        Ok(readings)
    }

    async fn regenerate_readings(&self, sampler: Sampler<'_>) -> Result<ReplaceSummary, DBError> {
        let failing = self
            .failing_regenerations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(DBError::SQLError(sqlx::Error::PoolTimedOut));
        }

        let mut tables = self.tables.lock();
        let checkpoint_ids: Vec<i32> = tables.checkpoints.iter().map(|c| c.id).collect();

        let mut summary = ReplaceSummary {
            checkpoints: checkpoint_ids.len(),
            ..Default::default()
        };
        for checkpoint_id in checkpoint_ids {
            for sample in sampler() {
                summary.record(tables.upsert_reading(checkpoint_id, &sample));
            }
        }
        Ok(summary)
    }

    async fn pump(&self, checkpoint_id: i32) -> Result<Option<PumpDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables
            .pumps
            .iter()
            .find(|p| p.checkpoint_id == checkpoint_id)
            .cloned())
    }

    async fn pumps(&self, user_id: i32) -> Result<Vec<PumpDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables
            .pumps
            .iter()
            .filter(|p| tables.owns_checkpoint(user_id, p.checkpoint_id))
            .cloned()
            .collect())
    }

    async fn set_pump(
        &self,
        user_id: i32,
        pump_id: i32,
        is_on: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<PumpDao>, DBError> {
        let mut tables = self.tables.lock();
        let owned = tables
            .pumps
            .iter()
            .any(|p| p.id == pump_id && tables.owns_checkpoint(user_id, p.checkpoint_id));
        if !owned {
            return Ok(None);
        }
        let pump = tables.pumps.iter_mut().find(|p| p.id == pump_id);
        Ok(pump.map(|p| {
            p.is_on = is_on;
            if is_on {
                p.last_activated = Some(now);
            }
            p.clone()
        }))
    }

    async fn insert_trigger(&self, field_id: i32, new: &NewTrigger) -> Result<TriggerDao, DBError> {
        let mut tables = self.tables.lock();
        if !tables.fields.iter().any(|f| f.id == field_id) {
            return Err(DBError::FieldNotFound(field_id));
        }
        let id = tables.next_id();
        let trigger = TriggerDao {
            id,
            field_id,
            name: new.name.clone(),
            weather_metric: new.weather_metric.as_str().to_owned(),
            condition: new.condition.as_str().to_owned(),
            threshold: new.threshold,
            action: new.action.as_str().to_owned(),
            is_active: new.is_active,
            created_at: Utc::now(),
            last_triggered: None,
        };
        tables.triggers.push(trigger.clone());
        Ok(trigger)
    }

    async fn triggers(&self, user_id: i32, field_id: Option<i32>) -> Result<Vec<TriggerDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables
            .triggers
            .iter()
            .filter(|t| tables.owns_field(user_id, t.field_id))
            .filter(|t| field_id.map_or(true, |id| t.field_id == id))
            .cloned()
            .collect())
    }

    async fn trigger(&self, user_id: i32, trigger_id: i32) -> Result<Option<TriggerDao>, DBError> {
        let tables = self.tables.lock();
        Ok(tables
            .triggers
            .iter()
            .find(|t| t.id == trigger_id && tables.owns_field(user_id, t.field_id))
            .cloned())
    }

    async fn update_trigger(&self, user_id: i32, trigger: &TriggerDao) -> Result<bool, DBError> {
        let mut tables = self.tables.lock();
        let owned = tables
            .triggers
            .iter()
            .any(|t| t.id == trigger.id && tables.owns_field(user_id, t.field_id));
        if !owned {
            return Ok(false);
        }
        if let Some(stored) = tables.triggers.iter_mut().find(|t| t.id == trigger.id) {
            stored.name = trigger.name.clone();
            stored.weather_metric = trigger.weather_metric.clone();
            stored.condition = trigger.condition.clone();
            stored.threshold = trigger.threshold;
            stored.action = trigger.action.clone();
            stored.is_active = trigger.is_active;
        }
        Ok(true)
    }

    async fn delete_trigger(&self, user_id: i32, trigger_id: i32) -> Result<bool, DBError> {
        let mut tables = self.tables.lock();
        let owned = tables
            .triggers
            .iter()
            .any(|t| t.id == trigger_id && tables.owns_field(user_id, t.field_id));
        if owned {
            tables.triggers.retain(|t| t.id != trigger_id);
        }
        Ok(owned)
    }

    async fn evaluate_trigger(
        &self,
        user_id: i32,
        trigger_id: i32,
        sample: &WeatherSample,
        now: DateTime<Utc>,
    ) -> Result<Option<Firing>, DBError> {
        let mut tables = self.tables.lock();
        let locked = match tables
            .triggers
            .iter()
            .find(|t| t.id == trigger_id && tables.owns_field(user_id, t.field_id))
            .cloned()
        {
            Some(locked) => locked,
            None => return Ok(None),
        };
        let rule = locked.rule()?;
        let evaluation = rule.evaluate(sample);

        let mut switched = 0;
        if let Ok(Evaluation::Fired { .. }) = evaluation {
            let is_on = rule.action.pump_state();
            let checkpoint_ids: Vec<i32> = tables
                .checkpoints
                .iter()
                .filter(|c| c.field_id == locked.field_id)
                .map(|c| c.id)
                .collect();
            for pump in tables
                .pumps
                .iter_mut()
                .filter(|p| checkpoint_ids.contains(&p.checkpoint_id))
            {
                pump.is_on = is_on;
                if is_on {
                    pump.last_activated = Some(now);
                }
                switched += 1;
            }
            if let Some(stored) = tables.triggers.iter_mut().find(|t| t.id == trigger_id) {
                stored.last_triggered = Some(now);
            }
        }

        Ok(Some(Firing {
            trigger: locked,
            evaluation,
            switched,
        }))
    }
}
