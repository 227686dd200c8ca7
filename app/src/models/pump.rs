use crate::error::DBError;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

#[derive(sqlx::FromRow, Debug, Clone)]
#[allow(dead_code)]
pub struct PumpDao {
    pub(crate) id: i32,
    pub(crate) checkpoint_id: i32,
    pub(crate) name: String,
    pub(crate) is_on: bool,
    pub(crate) last_activated: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
}

impl PumpDao {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn checkpoint_id(&self) -> i32 {
        self.checkpoint_id
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn last_activated(&self) -> Option<DateTime<Utc>> {
        self.last_activated
    }
}

pub fn pump_name(checkpoint_name: &str) -> String {
    format!("Pump {}", checkpoint_name)
}

pub async fn insert(
    conn: &mut PgConnection,
    checkpoint_id: i32,
    name: &str,
) -> Result<PumpDao, DBError> {
    Ok(sql_stmnt!(
        PumpDao,
        "INSERT INTO pumps (checkpoint_id, name) VALUES ($1, $2) RETURNING *",
        checkpoint_id,
        name
    )
    .fetch_one(&mut *conn)
    .await?)
}

pub async fn get_for_checkpoint(
    conn: &mut PgConnection,
    checkpoint_id: i32,
) -> Result<Option<PumpDao>, DBError> {
    Ok(sql_stmnt!(
        PumpDao,
        "SELECT * FROM pumps WHERE checkpoint_id = $1",
        checkpoint_id
    )
    .fetch_optional(&mut *conn)
    .await?)
}

/// READ pumps of a user
pub async fn read(conn: &mut PgConnection, user_id: i32) -> Result<Vec<PumpDao>, DBError> {
    Ok(sql_stmnt!(
        PumpDao,
        r#"SELECT p.id, p.checkpoint_id, p.name, p.is_on, p.last_activated, p.created_at
            FROM pumps as p
            JOIN checkpoints ON (p.checkpoint_id = checkpoints.id)
            JOIN fields ON (checkpoints.field_id = fields.id)
            WHERE fields.user_id = $1
            ORDER BY p.id ASC"#,
        user_id
    )
    .fetch_all(&mut *conn)
    .await?)
}

/// Switches a single pump; `last_activated` is only stamped when turning on
pub async fn set_state(
    conn: &mut PgConnection,
    user_id: i32,
    pump_id: i32,
    is_on: bool,
    now: DateTime<Utc>,
) -> Result<Option<PumpDao>, DBError> {
    Ok(sql_stmnt!(
        PumpDao,
        r#"UPDATE pumps
            SET is_on = $3, last_activated = CASE WHEN $3 THEN $4 ELSE pumps.last_activated END
            FROM checkpoints, fields
            WHERE pumps.id = $1
            AND pumps.checkpoint_id = checkpoints.id
            AND checkpoints.field_id = fields.id
            AND fields.user_id = $2
            RETURNING pumps.*"#,
        pump_id,
        user_id,
        is_on,
        now
    )
    .fetch_optional(&mut *conn)
    .await?)
}

/// Switches every pump below a field, returns the number of pumps touched
pub async fn set_state_for_field(
    conn: &mut PgConnection,
    field_id: i32,
    is_on: bool,
    now: DateTime<Utc>,
) -> Result<u64, DBError> {
    let result = sql_stmnt!(
        r#"UPDATE pumps
            SET is_on = $2, last_activated = CASE WHEN $2 THEN $3 ELSE pumps.last_activated END
            FROM checkpoints
            WHERE pumps.checkpoint_id = checkpoints.id AND checkpoints.field_id = $1"#,
        field_id,
        is_on,
        now
    )
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}
