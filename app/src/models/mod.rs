use crate::config::CONFIG;
use crate::error::DBError;

// Queries are checked at runtime so the crate builds without a live database.
macro_rules! sql_stmnt {
    ($ret:ident, $stmt:expr) => {
        sqlx::query_as::<_, $ret>($stmt)
    };
    ($stmt:expr) => {
        sqlx::query($stmt)
    };
    ($ret:ident, $stmt:expr, $($bind:expr),*) => {
        sqlx::query_as::<_, $ret>($stmt)$(.bind($bind))*
    };
    ($stmt:expr, $($bind:expr),*) => {
        sqlx::query($stmt)$(.bind($bind))*
    };
}

pub async fn establish_db_connection() -> Option<sqlx::PgPool> {
    let database_url = CONFIG.database_url();
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(CONFIG.database_max_connections())
        .connect(&database_url)
        .await
        .ok()
}

pub async fn migrate(conn: &sqlx::PgPool) -> Result<(), DBError> {
    sqlx::migrate!("./migrations").run(conn).await?;
    Ok(())
}

pub async fn check_schema(conn: &sqlx::PgPool) -> Result<(), DBError> {
    sql_stmnt!("SELECT count(*) as count FROM checkpoints")
        .fetch_one(conn)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
pub(crate) struct CountRecord {
    pub count: Option<i64>,
}

impl CountRecord {
    pub fn count(self) -> i64 {
        self.count.unwrap_or(0)
    }
}

pub mod checkpoint;
pub mod field;
pub mod pump;
pub mod reading;
pub mod session;
pub mod store;
pub mod trigger;
pub mod user;

#[cfg(test)]
pub mod memory;

pub use store::{PgStore, Store};
