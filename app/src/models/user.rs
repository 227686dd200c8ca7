use super::CountRecord;
use crate::error::DBError;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserDao {
    pub(crate) id: i32,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) created_at: DateTime<Utc>,
}

impl UserDao {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn username(&self) -> &String {
        &self.username
    }

    pub fn email(&self) -> &String {
        &self.email
    }

    pub fn password_hash(&self) -> &String {
        &self.password_hash
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub async fn insert(
    conn: &mut PgConnection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<UserDao, DBError> {
    Ok(sql_stmnt!(
        UserDao,
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
        username,
        email,
        password_hash
    )
    .fetch_one(&mut *conn)
    .await?)
}

pub async fn get(conn: &mut PgConnection, user_id: i32) -> Result<Option<UserDao>, DBError> {
    Ok(sql_stmnt!(UserDao, "SELECT * FROM users WHERE id = $1", user_id)
        .fetch_optional(&mut *conn)
        .await?)
}

pub async fn get_by_name(
    conn: &mut PgConnection,
    username: &str,
) -> Result<Option<UserDao>, DBError> {
    Ok(sql_stmnt!(UserDao, "SELECT * FROM users WHERE username = $1", username)
        .fetch_optional(&mut *conn)
        .await?)
}

pub async fn exists_with_email(conn: &mut PgConnection, email: &str) -> Result<bool, DBError> {
    let count = sql_stmnt!(
        CountRecord,
        "SELECT count(*) as count FROM users WHERE email = $1",
        email
    )
    .fetch_one(&mut *conn)
    .await?;
    Ok(count.count() > 0)
}
