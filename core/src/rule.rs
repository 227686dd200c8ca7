use crate::error::RuleError;
use crate::{WeatherMetric, WeatherSample};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    GreaterThan,
    LessThan,
    Equals,
}

impl Comparison {
    pub const ALL: [Comparison; 3] = [
        Comparison::GreaterThan,
        Comparison::LessThan,
        Comparison::Equals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => "greater_than",
            Comparison::LessThan => "less_than",
            Comparison::Equals => "equals",
        }
    }

    /// `Equals` is an exact floating point comparison.
    #[allow(clippy::float_cmp)]
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::LessThan => value < threshold,
            Comparison::Equals => value == threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparison {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Comparison::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| RuleError::unknown("condition", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggerAction {
    PowerOnAllPumps,
    PowerOffAllPumps,
}

impl TriggerAction {
    pub const ALL: [TriggerAction; 2] = [TriggerAction::PowerOnAllPumps, TriggerAction::PowerOffAllPumps];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerAction::PowerOnAllPumps => "power_on_all_pumps",
            TriggerAction::PowerOffAllPumps => "power_off_all_pumps",
        }
    }

    /// The pump state this action drives every pump of a field to.
    pub fn pump_state(&self) -> bool {
        matches!(self, TriggerAction::PowerOnAllPumps)
    }
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerAction {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriggerAction::ALL
            .iter()
            .find(|a| a.as_str() == s)
            .copied()
            .ok_or_else(|| RuleError::unknown("action", s))
    }
}

/// The decision-relevant part of a stored trigger rule.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRule {
    pub metric: WeatherMetric,
    pub comparison: Comparison,
    pub threshold: f64,
    pub action: TriggerAction,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// The rule is disabled and was not looked at.
    Inactive,
    Fired { observed: f64, threshold: f64 },
    Held { observed: f64, threshold: f64 },
}

impl Evaluation {
    pub fn fired(&self) -> bool {
        matches!(self, Evaluation::Fired { .. })
    }

    pub fn observed(&self) -> Option<f64> {
        match self {
            Evaluation::Inactive => None,
            Evaluation::Fired { observed, .. } | Evaluation::Held { observed, .. } => {
                Some(*observed)
            }
        }
    }
}

impl TriggerRule {
    /// Decides whether the rule fires for `sample`. Has no side effects.
    pub fn evaluate(&self, sample: &WeatherSample) -> Result<Evaluation, RuleError> {
        if !self.is_active {
            return Ok(Evaluation::Inactive);
        }

        let observed = sample
            .value(self.metric)
            .ok_or(RuleError::MissingMetric(self.metric))?;
        let threshold = self.threshold;

        if self.comparison.holds(observed, threshold) {
            debug!(
                metric = self.metric.as_str(),
                "{} {} {} holds", observed, self.comparison, threshold
            );
            Ok(Evaluation::Fired {
                observed,
                threshold,
            })
        } else {
            Ok(Evaluation::Held {
                observed,
                threshold,
            })
        }
    }
}
