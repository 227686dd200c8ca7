use crate::error::DBError;
use chrono::{DateTime, Utc};
use irrigo_core::{
    error::RuleError, Comparison, Evaluation, TriggerAction, TriggerRule, WeatherMetric,
};
use sqlx::PgConnection;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct TriggerDao {
    pub(crate) id: i32,
    pub(crate) field_id: i32,
    pub(crate) name: String,
    pub(crate) weather_metric: String,
    pub(crate) condition: String,
    pub(crate) threshold: f64,
    pub(crate) action: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_triggered: Option<DateTime<Utc>>,
}

/// A trigger task as submitted by a user, before it got an id.
#[derive(Debug, Clone)]
pub struct NewTrigger {
    pub name: String,
    pub weather_metric: WeatherMetric,
    pub condition: Comparison,
    pub threshold: f64,
    pub action: TriggerAction,
    pub is_active: bool,
}

/// A trigger task evaluated under its row lock, and what firing it switched.
#[derive(Debug, Clone)]
pub struct Firing {
    pub trigger: TriggerDao,
    pub evaluation: Result<Evaluation, RuleError>,
    pub switched: u64,
}

impl TriggerDao {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn field_id(&self) -> i32 {
        self.field_id
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn last_triggered(&self) -> Option<DateTime<Utc>> {
        self.last_triggered
    }

    pub fn weather_metric(&self) -> Result<WeatherMetric, RuleError> {
        self.weather_metric.parse()
    }

    pub fn condition(&self) -> Result<Comparison, RuleError> {
        self.condition.parse()
    }

    pub fn action(&self) -> Result<TriggerAction, RuleError> {
        self.action.parse()
    }

    pub fn rule(&self) -> Result<TriggerRule, RuleError> {
        Ok(TriggerRule {
            metric: self.weather_metric()?,
            comparison: self.condition()?,
            threshold: self.threshold,
            action: self.action()?,
            is_active: self.is_active,
        })
    }
}

pub async fn insert(
    conn: &mut PgConnection,
    field_id: i32,
    new: &NewTrigger,
) -> Result<TriggerDao, DBError> {
    Ok(sql_stmnt!(
        TriggerDao,
        r#"INSERT INTO trigger_tasks
            (field_id, name, weather_metric, condition, threshold, action, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *"#,
        field_id,
        &new.name,
        new.weather_metric.as_str(),
        new.condition.as_str(),
        new.threshold,
        new.action.as_str(),
        new.is_active
    )
    .fetch_one(&mut *conn)
    .await?)
}

/// READ trigger tasks of a user, optionally limited to one field
pub async fn read(
    conn: &mut PgConnection,
    user_id: i32,
    field_id: Option<i32>,
) -> Result<Vec<TriggerDao>, DBError> {
    Ok(sql_stmnt!(
        TriggerDao,
        r#"SELECT t.id, t.field_id, t.name, t.weather_metric, t.condition, t.threshold,
                t.action, t.is_active, t.created_at, t.last_triggered
            FROM trigger_tasks as t
            JOIN fields ON (t.field_id = fields.id)
            WHERE fields.user_id = $1 AND ($2::INTEGER IS NULL OR t.field_id = $2)
            ORDER BY t.id ASC"#,
        user_id,
        field_id
    )
    .fetch_all(&mut *conn)
    .await?)
}

pub async fn get(
    conn: &mut PgConnection,
    user_id: i32,
    trigger_id: i32,
) -> Result<Option<TriggerDao>, DBError> {
    Ok(sql_stmnt!(
        TriggerDao,
        r#"SELECT t.id, t.field_id, t.name, t.weather_metric, t.condition, t.threshold,
                t.action, t.is_active, t.created_at, t.last_triggered
            FROM trigger_tasks as t
            JOIN fields ON (t.field_id = fields.id)
            WHERE t.id = $1 AND fields.user_id = $2"#,
        trigger_id,
        user_id
    )
    .fetch_optional(&mut *conn)
    .await?)
}

/// READ a trigger task and hold its row lock until the transaction ends
pub async fn lock(
    conn: &mut PgConnection,
    user_id: i32,
    trigger_id: i32,
) -> Result<Option<TriggerDao>, DBError> {
    Ok(sql_stmnt!(
        TriggerDao,
        r#"SELECT t.id, t.field_id, t.name, t.weather_metric, t.condition, t.threshold,
                t.action, t.is_active, t.created_at, t.last_triggered
            FROM trigger_tasks as t
            JOIN fields ON (t.field_id = fields.id)
            WHERE t.id = $1 AND fields.user_id = $2
            FOR UPDATE OF t"#,
        trigger_id,
        user_id
    )
    .fetch_optional(&mut *conn)
    .await?)
}

// UPDATE trigger_tasks
pub async fn update(
    conn: &mut PgConnection,
    user_id: i32,
    trigger: &TriggerDao,
) -> Result<bool, DBError> {
    let result = sql_stmnt!(
        r#"UPDATE trigger_tasks
            SET name = $1, weather_metric = $2, condition = $3, threshold = $4, action = $5, is_active = $6
            FROM fields
            WHERE trigger_tasks.id = $7 AND trigger_tasks.field_id = fields.id AND fields.user_id = $8"#,
        &trigger.name,
        &trigger.weather_metric,
        &trigger.condition,
        trigger.threshold,
        &trigger.action,
        trigger.is_active,
        trigger.id,
        user_id
    )
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn stamp_triggered(
    conn: &mut PgConnection,
    trigger_id: i32,
    now: DateTime<Utc>,
) -> Result<(), DBError> {
    let result = sql_stmnt!(
        "UPDATE trigger_tasks SET last_triggered = $1 WHERE id = $2",
        now,
        trigger_id
    )
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() != 1 {
        return Err(DBError::TriggerNotFound(trigger_id));
    }
    Ok(())
}

/// DELETE trigger_tasks
pub async fn delete(conn: &mut PgConnection, user_id: i32, trigger_id: i32) -> Result<bool, DBError> {
    let result = sql_stmnt!(
        r#"DELETE FROM trigger_tasks
            USING fields
            WHERE trigger_tasks.id = $1 AND trigger_tasks.field_id = fields.id AND fields.user_id = $2"#,
        trigger_id,
        user_id
    )
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
