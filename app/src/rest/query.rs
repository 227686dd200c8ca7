use crate::error::ValidationError;

pub const DEFAULT_WEATHER_CITY: &str = "London";

#[derive(serde::Serialize, serde::Deserialize, Default)]
pub struct CityQuery {
    city: Option<String>,
}

impl CityQuery {
    pub fn city(&self) -> &str {
        self.city.as_deref().unwrap_or(DEFAULT_WEATHER_CITY)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Default)]
pub struct FieldQuery {
    field_id: Option<String>,
}

impl FieldQuery {
    /// An empty `field_id` means no filter.
    pub fn field_id(&self) -> Result<Option<i32>, ValidationError> {
        match self.field_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ValidationError::new("field_id", "must be an integer")),
        }
    }
}
