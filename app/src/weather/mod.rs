use crate::error::WeatherError;
use async_trait::async_trait;
use irrigo_core::WeatherSample;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Current conditions in a city, in metric units.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct WeatherReport {
    pub city: String,
    pub temperature: f64,
    pub description: String,
    pub humidity: f64,
    pub wind_speed: f64,
}

impl From<&WeatherReport> for WeatherSample {
    fn from(report: &WeatherReport) -> Self {
        WeatherSample {
            temperature: Some(report.temperature),
            humidity: Some(report.humidity),
            wind_speed: Some(report.wind_speed),
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str) -> Result<WeatherReport, WeatherError>;
}

/// Client for the OpenWeatherMap current weather endpoint.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(api_url: String, api_key: String, timeout: Duration) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(OpenWeatherClient {
            client,
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[tracing::instrument(skip(self))]
    async fn current(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Weather service answered {}", status);
            return Err(WeatherError::Rejected(status.as_u16()));
        }

        let body = response.text().await?;
        let report = parse_report(&body)?;
        debug!(city = %report.city, "Fetched weather");
        Ok(report)
    }
}

#[derive(Deserialize)]
struct OwmPayload {
    name: String,
    main: OwmMain,
    weather: Vec<OwmCondition>,
    wind: OwmWind,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Deserialize)]
struct OwmWind {
    speed: f64,
}

pub(crate) fn parse_report(body: &str) -> Result<WeatherReport, WeatherError> {
    let payload: OwmPayload =
        serde_json::from_str(body).map_err(|e| WeatherError::Payload(e.to_string()))?;
    let description = payload
        .weather
        .into_iter()
        .next()
        .map(|c| c.description)
        .ok_or_else(|| WeatherError::Payload("no weather condition".to_owned()))?;

    Ok(WeatherReport {
        city: payload.name,
        temperature: payload.main.temp,
        description,
        humidity: payload.main.humidity,
        wind_speed: payload.wind.speed,
    })
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_report() {
        let body = r#"{
            "name": "Dublin",
            "main": {"temp": 12.3, "humidity": 81},
            "weather": [{"description": "light rain"}, {"description": "mist"}],
            "wind": {"speed": 5.7}
        }"#;

        let report = parse_report(body).unwrap();

        assert_eq!("Dublin", report.city);
        assert_eq!(12.3, report.temperature);
        assert_eq!("light rain", report.description);
        assert_eq!(81.0, report.humidity);
        assert_eq!(5.7, report.wind_speed);
    }

    #[test]
    fn test_parse_report_without_condition() {
        let body = r#"{"name": "Dublin", "main": {"temp": 1, "humidity": 2}, "weather": [], "wind": {"speed": 3}}"#;

        assert!(matches!(parse_report(body), Err(WeatherError::Payload(_))));
    }

    #[test]
    fn test_parse_report_garbage() {
        assert!(matches!(
            parse_report("<html>"),
            Err(WeatherError::Payload(_))
        ));
    }

    #[test]
    fn test_report_into_sample() {
        let report = WeatherReport {
            city: "Cork".to_owned(),
            temperature: 32.0,
            description: "hot".to_owned(),
            humidity: 40.0,
            wind_speed: 1.0,
        };

        let sample = WeatherSample::from(&report);

        assert_eq!(Some(32.0), sample.temperature);
        assert_eq!(Some(1.0), sample.wind_speed);
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let client = OpenWeatherClient::new(
            "http://127.0.0.1:9/weather".to_owned(),
            "key".to_owned(),
            Duration::from_millis(500),
        )
        .unwrap();

        let res = client.current("London").await;

        assert!(matches!(res, Err(WeatherError::Unavailable(_))));
    }
}
