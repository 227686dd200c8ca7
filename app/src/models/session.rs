use crate::error::DBError;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

#[derive(sqlx::FromRow, Debug, Clone)]
#[allow(dead_code)]
pub struct SessionDao {
    pub(crate) token: String,
    pub(crate) user_id: i32,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) expires_at: DateTime<Utc>,
}

impl SessionDao {
    pub fn user_id(&self) -> i32 {
        self.user_id
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

pub async fn insert(
    conn: &mut PgConnection,
    token: &str,
    user_id: i32,
    expires_at: DateTime<Utc>,
) -> Result<(), DBError> {
    sql_stmnt!(
        "INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)",
        token,
        user_id,
        expires_at
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get(conn: &mut PgConnection, token: &str) -> Result<Option<SessionDao>, DBError> {
    Ok(sql_stmnt!(SessionDao, "SELECT * FROM sessions WHERE token = $1", token)
        .fetch_optional(&mut *conn)
        .await?)
}

pub async fn delete(conn: &mut PgConnection, token: &str) -> Result<(), DBError> {
    sql_stmnt!("DELETE FROM sessions WHERE token = $1", token)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_expired(conn: &mut PgConnection, now: DateTime<Utc>) -> Result<u64, DBError> {
    let result = sql_stmnt!("DELETE FROM sessions WHERE expires_at <= $1", now)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
