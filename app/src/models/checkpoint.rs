use crate::error::DBError;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct CheckpointDao {
    pub(crate) id: i32,
    pub(crate) field_id: i32,
    pub(crate) name: String,
    pub(crate) created_at: DateTime<Utc>,
}

impl CheckpointDao {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn field_id(&self) -> i32 {
        self.field_id
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub async fn insert(
    conn: &mut PgConnection,
    field_id: i32,
    name: &str,
) -> Result<CheckpointDao, DBError> {
    Ok(sql_stmnt!(
        CheckpointDao,
        "INSERT INTO checkpoints (field_id, name) VALUES ($1, $2) RETURNING *",
        field_id,
        name
    )
    .fetch_one(&mut *conn)
    .await?)
}

/// READ checkpoints of a field
pub async fn read(conn: &mut PgConnection, field_id: i32) -> Result<Vec<CheckpointDao>, DBError> {
    Ok(sql_stmnt!(
        CheckpointDao,
        "SELECT * FROM checkpoints WHERE field_id = $1 ORDER BY id ASC",
        field_id
    )
    .fetch_all(&mut *conn)
    .await?)
}

#[derive(sqlx::FromRow)]
struct IdRecord {
    id: i32,
}

/// READ every checkpoint id, regardless of owner. The rows stay share-locked
/// until the surrounding transaction ends, so none of them vanish mid-pass.
pub async fn lock_ids(conn: &mut PgConnection) -> Result<Vec<i32>, DBError> {
    let mut rows = sql_stmnt!(IdRecord, "SELECT id FROM checkpoints ORDER BY id ASC FOR SHARE")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.drain(..).map(|r| r.id).collect())
}

pub async fn get(
    conn: &mut PgConnection,
    user_id: i32,
    checkpoint_id: i32,
) -> Result<Option<CheckpointDao>, DBError> {
    Ok(sql_stmnt!(
        CheckpointDao,
        r#"SELECT c.id, c.field_id, c.name, c.created_at
            FROM checkpoints as c
            JOIN fields ON (c.field_id = fields.id)
            WHERE c.id = $1 AND fields.user_id = $2"#,
        checkpoint_id,
        user_id
    )
    .fetch_optional(&mut *conn)
    .await?)
}

// UPDATE checkpoint
pub async fn update(
    conn: &mut PgConnection,
    user_id: i32,
    checkpoint: &CheckpointDao,
) -> Result<bool, DBError> {
    let result = sql_stmnt!(
        r#"UPDATE checkpoints SET name = $1
            FROM fields
            WHERE checkpoints.id = $2 AND checkpoints.field_id = fields.id AND fields.user_id = $3"#,
        checkpoint.name(),
        checkpoint.id(),
        user_id
    )
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// DELETE checkpoint, cascading to readings and pump
pub async fn delete(
    conn: &mut PgConnection,
    user_id: i32,
    checkpoint_id: i32,
) -> Result<bool, DBError> {
    let result = sql_stmnt!(
        r#"DELETE FROM checkpoints
            USING fields
            WHERE checkpoints.id = $1 AND checkpoints.field_id = fields.id AND fields.user_id = $2"#,
        checkpoint_id,
        user_id
    )
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
