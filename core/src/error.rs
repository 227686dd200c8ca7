use crate::WeatherMetric;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("Weather metric {0} not found in weather data")]
    MissingMetric(WeatherMetric),
    #[error("Invalid {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl RuleError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        RuleError::UnknownVariant {
            kind,
            value: value.to_owned(),
        }
    }
}
