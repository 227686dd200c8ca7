use crate::error::RuleError;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// The fixed set of metrics every checkpoint reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SensorMetric {
    SoilMoisture,
    Temperature,
    Humidity,
    Light,
}

impl SensorMetric {
    pub const ALL: [SensorMetric; 4] = [
        SensorMetric::SoilMoisture,
        SensorMetric::Temperature,
        SensorMetric::Humidity,
        SensorMetric::Light,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorMetric::SoilMoisture => "soil_moisture",
            SensorMetric::Temperature => "temperature",
            SensorMetric::Humidity => "humidity",
            SensorMetric::Light => "light",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorMetric::SoilMoisture | SensorMetric::Humidity => "%",
            SensorMetric::Temperature => "°C",
            SensorMetric::Light => "lux",
        }
    }

    pub fn range(&self) -> RangeInclusive<f64> {
        match self {
            SensorMetric::SoilMoisture => 20.0..=80.0,
            SensorMetric::Temperature => 15.0..=35.0,
            SensorMetric::Humidity => 40.0..=90.0,
            SensorMetric::Light => 0.0..=1000.0,
        }
    }

    /// Uniform sample within `range()`, rounded to two decimals.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let range = self.range();
        let (min, max) = (*range.start(), *range.end());
        let raw = rng.gen_range(range);
        ((raw * 100.0).round() / 100.0).clamp(min, max)
    }
}

impl fmt::Display for SensorMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorMetric {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorMetric::ALL
            .iter()
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| RuleError::unknown("sensor metric", s))
    }
}

/// A freshly sampled value for one metric of one checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSample {
    pub metric: SensorMetric,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl ReadingSample {
    pub fn unit(&self) -> &'static str {
        self.metric.unit()
    }

    /// One sample per metric, all sharing the same timestamp.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, timestamp: DateTime<Utc>) -> Vec<ReadingSample> {
        SensorMetric::ALL
            .iter()
            .map(|metric| ReadingSample {
                metric: *metric,
                value: metric.sample(rng),
                timestamp,
            })
            .collect()
    }
}
