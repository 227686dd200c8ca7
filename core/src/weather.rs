use crate::error::RuleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Weather quantities a trigger rule can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WeatherMetric {
    Temperature,
    Humidity,
    WindSpeed,
}

impl WeatherMetric {
    pub const ALL: [WeatherMetric; 3] = [
        WeatherMetric::Temperature,
        WeatherMetric::Humidity,
        WeatherMetric::WindSpeed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherMetric::Temperature => "temperature",
            WeatherMetric::Humidity => "humidity",
            WeatherMetric::WindSpeed => "wind_speed",
        }
    }
}

impl fmt::Display for WeatherMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherMetric {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeatherMetric::ALL
            .iter()
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| RuleError::unknown("weather metric", s))
    }
}

/// A weather observation as sent by the client for evaluation.
///
/// Every quantity is optional; unrelated keys (city, description, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WeatherSample {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
}

impl WeatherSample {
    pub fn value(&self, metric: WeatherMetric) -> Option<f64> {
        match metric {
            WeatherMetric::Temperature => self.temperature,
            WeatherMetric::Humidity => self.humidity,
            WeatherMetric::WindSpeed => self.wind_speed,
        }
    }
}
