use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

const GEO_ENDPOINT: &str = "https://api.openweathermap.org/geo/1.0/direct";
const ONECALL_ENDPOINT: &str = "https://api.openweathermap.org/data/3.0/onecall";

/// A city candidate returned by the geocoding source for a free-text query.
#[derive(Clone, Debug, Deserialize)]
pub struct CityCandidate {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConditionSummary {
    pub main: String,
    pub description: String,
}

/// Current conditions for a coordinate pair (imperial units).
#[derive(Clone, Debug, Deserialize)]
pub struct Conditions {
    pub temp: f64,
    pub humidity: i64,
    pub wind_speed: f64,
    #[serde(default)]
    pub weather: Vec<ConditionSummary>,
}

impl Conditions {
    /// One-line human-readable summary; this is the string fed into the
    /// generation prompts.
    pub fn summary(&self) -> String {
        let description = self
            .weather
            .first()
            .map(|w| w.description.as_str())
            .unwrap_or("unknown conditions");
        format!(
            "{:.1}°F, {description}, humidity {}%, wind {:.1} mph",
            self.temp, self.humidity, self.wind_speed
        )
    }
}

#[derive(Deserialize)]
struct OneCallResponse {
    current: Conditions,
}

/// Thin typed client over the weather/geocoding HTTP data source.
pub struct WeatherClient {
    client: reqwest::Client,
    api_key: String,
}

impl WeatherClient {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ExternalService(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }

    /// Resolves a free-text query to up to five city candidates.
    pub async fn search_city(&self, query: &str) -> Result<Vec<CityCandidate>, AppError> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "search query must not be empty".to_string(),
            ));
        }

        let response = self
            .client
            .get(GEO_ENDPOINT)
            .query(&[
                ("q", query),
                ("limit", "5"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalService(format!(
                "geocoding endpoint returned status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))
    }

    /// Fetches current conditions for a coordinate pair.
    pub async fn current_conditions(&self, lat: f64, lon: f64) -> Result<Conditions, AppError> {
        let response = self
            .client
            .get(ONECALL_ENDPOINT)
            .query(&[
                ("lat", lat.to_string().as_str()),
                ("lon", lon.to_string().as_str()),
                ("exclude", "minutely,hourly,daily,alerts"),
                ("units", "imperial"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalService(format!(
                "weather endpoint returned status {status}"
            )));
        }

        let body: OneCallResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;
        Ok(body.current)
    }
}
