use super::CountRecord;
use crate::error::DBError;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct FieldDao {
    pub(crate) id: i32,
    pub(crate) user_id: i32,
    pub(crate) name: String,
    pub(crate) city: String,
    pub(crate) created_at: DateTime<Utc>,
}

impl FieldDao {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn user_id(&self) -> i32 {
        self.user_id
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn city(&self) -> &String {
        &self.city
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub async fn insert(
    conn: &mut PgConnection,
    user_id: i32,
    name: &str,
    city: &str,
) -> Result<FieldDao, DBError> {
    Ok(sql_stmnt!(
        FieldDao,
        "INSERT INTO fields (user_id, name, city) VALUES ($1, $2, $3) RETURNING *",
        user_id,
        name,
        city
    )
    .fetch_one(&mut *conn)
    .await?)
}

/// READ fields of a user
pub async fn read(conn: &mut PgConnection, user_id: i32) -> Result<Vec<FieldDao>, DBError> {
    Ok(sql_stmnt!(
        FieldDao,
        "SELECT * FROM fields WHERE user_id = $1 ORDER BY id ASC",
        user_id
    )
    .fetch_all(&mut *conn)
    .await?)
}

pub async fn get(
    conn: &mut PgConnection,
    user_id: i32,
    field_id: i32,
) -> Result<Option<FieldDao>, DBError> {
    Ok(sql_stmnt!(
        FieldDao,
        "SELECT * FROM fields WHERE id = $1 AND user_id = $2",
        field_id,
        user_id
    )
    .fetch_optional(&mut *conn)
    .await?)
}

pub async fn exists_with_name(
    conn: &mut PgConnection,
    user_id: i32,
    name: &str,
    except_id: Option<i32>,
) -> Result<bool, DBError> {
    let count = sql_stmnt!(
        CountRecord,
        r#"SELECT count(*) as count FROM fields
            WHERE user_id = $1 AND name = $2 AND ($3::INTEGER IS NULL OR id <> $3)"#,
        user_id,
        name,
        except_id
    )
    .fetch_one(&mut *conn)
    .await?;
    Ok(count.count() > 0)
}

// UPDATE field
pub async fn update(conn: &mut PgConnection, field: &FieldDao) -> Result<bool, DBError> {
    let result = sql_stmnt!(
        "UPDATE fields SET name = $1, city = $2 WHERE id = $3 AND user_id = $4",
        field.name(),
        field.city(),
        field.id(),
        field.user_id()
    )
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// DELETE field, cascading to checkpoints, readings, pumps and trigger tasks
pub async fn delete(conn: &mut PgConnection, user_id: i32, field_id: i32) -> Result<bool, DBError> {
    let result = sql_stmnt!(
        "DELETE FROM fields WHERE id = $1 AND user_id = $2",
        field_id,
        user_id
    )
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
