use crate::error::DBError;
use chrono::{DateTime, Utc};
use irrigo_core::{error::RuleError, ReadingSample, SensorMetric};
use sqlx::PgConnection;

#[derive(sqlx::FromRow, Debug, Clone)]
#[allow(dead_code)]
pub struct ReadingDao {
    pub(crate) id: i32,
    pub(crate) checkpoint_id: i32,
    pub(crate) metric: String,
    pub(crate) value: f64,
    pub(crate) unit: String,
    pub(crate) timestamp: DateTime<Utc>,
}

impl ReadingDao {
    pub fn metric(&self) -> Result<SensorMetric, RuleError> {
        self.metric.parse()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &String {
        &self.unit
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Upserted {
    Updated,
    Created,
}

/// Outcome of one regeneration pass.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ReplaceSummary {
    pub checkpoints: usize,
    pub updated: usize,
    pub created: usize,
}

impl ReplaceSummary {
    pub fn record(&mut self, upserted: Upserted) {
        match upserted {
            Upserted::Updated => self.updated += 1,
            Upserted::Created => self.created += 1,
        }
    }
}

/// Overwrites the current reading of a metric, inserting it if it is missing
pub async fn upsert(
    conn: &mut PgConnection,
    checkpoint_id: i32,
    sample: &ReadingSample,
) -> Result<Upserted, DBError> {
    let update_result = sql_stmnt!(
        r#"UPDATE sensor_readings
            SET value = $3, unit = $4, timestamp = $5
            WHERE checkpoint_id = $1 AND metric = $2"#,
        checkpoint_id,
        sample.metric.as_str(),
        sample.value,
        sample.unit(),
        sample.timestamp
    )
    .execute(&mut *conn)
    .await?;

    if update_result.rows_affected() > 0 {
        return Ok(Upserted::Updated);
    }

    sql_stmnt!(
        r#"INSERT INTO sensor_readings
            (checkpoint_id, metric, value, unit, timestamp)
            VALUES ($1, $2, $3, $4, $5)"#,
        checkpoint_id,
        sample.metric.as_str(),
        sample.value,
        sample.unit(),
        sample.timestamp
    )
    .execute(&mut *conn)
    .await?;
    Ok(Upserted::Created)
}

// READ sensor_readings
pub async fn read(conn: &mut PgConnection, checkpoint_id: i32) -> Result<Vec<ReadingDao>, DBError> {
    Ok(sql_stmnt!(
        ReadingDao,
        "SELECT * FROM sensor_readings WHERE checkpoint_id = $1 ORDER BY metric ASC",
        checkpoint_id
    )
    .fetch_all(&mut *conn)
    .await?)
}
