//! `OpenWeather` air pollution API client.
//!
//! Covers the current, history, and forecast endpoints, which all share
//! the same `{ "list": [ { "dt", "main": { "aqi" }, "components" } ] }`
//! payload shape. Component concentrations are passed through in
//! provider-native units (µg/m³, `co` in the provider's mg/m³ scale) —
//! unit normalization is not this layer's concern.

use aqi_monitor_air_models::PollutantReading;
use async_trait::async_trait;
use serde::Deserialize;

use crate::{PollutantSource, RawSample, UpstreamError};

/// Default `OpenWeather` API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// `OpenWeather` air pollution client.
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenWeatherClient {
    /// Creates a client using the production API base URL.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Creates a client against a custom base URL.
    #[must_use]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_list(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<RawSample>, UpstreamError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_samples(&body)
    }

    fn base_query(&self, lat: f64, lon: f64) -> Vec<(&'static str, String)> {
        vec![
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", self.api_key.clone()),
        ]
    }
}

#[derive(Deserialize)]
struct AirPollutionResponse {
    #[serde(default)]
    list: Vec<AirPollutionEntry>,
}

#[derive(Deserialize)]
struct AirPollutionEntry {
    dt: i64,
    #[serde(default)]
    components: Components,
}

#[derive(Deserialize, Default)]
struct Components {
    #[serde(default)]
    pm2_5: Option<f64>,
    #[serde(default)]
    pm10: Option<f64>,
    #[serde(default)]
    no2: Option<f64>,
    #[serde(default)]
    so2: Option<f64>,
    #[serde(default)]
    co: Option<f64>,
    #[serde(default)]
    o3: Option<f64>,
}

impl From<Components> for PollutantReading {
    fn from(c: Components) -> Self {
        Self {
            pm2_5: c.pm2_5,
            pm10: c.pm10,
            no2: c.no2,
            so2: c.so2,
            co: c.co,
            o3: c.o3,
        }
    }
}

/// Parses an air pollution payload into timestamped samples.
///
/// # Errors
///
/// Returns [`UpstreamError::Json`] when the payload is not valid JSON of
/// the expected shape.
pub fn parse_samples(body: &str) -> Result<Vec<RawSample>, UpstreamError> {
    let response: AirPollutionResponse = serde_json::from_str(body)?;
    Ok(response
        .list
        .into_iter()
        .map(|entry| RawSample {
            dt: entry.dt,
            components: entry.components.into(),
        })
        .collect())
}

#[async_trait]
impl PollutantSource for OpenWeatherClient {
    async fn current(&self, lat: f64, lon: f64) -> Result<PollutantReading, UpstreamError> {
        let samples = self
            .fetch_list("/data/2.5/air_pollution", &self.base_query(lat, lon))
            .await?;
        samples
            .into_iter()
            .next()
            .map(|sample| sample.components)
            .ok_or_else(|| UpstreamError::Malformed {
                message: "current air pollution payload had an empty list".to_string(),
            })
    }

    async fn history(
        &self,
        lat: f64,
        lon: f64,
        from: i64,
        to: i64,
    ) -> Result<Vec<RawSample>, UpstreamError> {
        let mut query = self.base_query(lat, lon);
        query.push(("start", from.to_string()));
        query.push(("end", to.to_string()));
        self.fetch_list("/data/2.5/air_pollution/history", &query)
            .await
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<RawSample>, UpstreamError> {
        self.fetch_list("/data/2.5/air_pollution/forecast", &self.base_query(lat, lon))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sample_list() {
        let body = r#"{
            "coord": { "lon": 77.21, "lat": 28.61 },
            "list": [
                {
                    "dt": 1767225600,
                    "main": { "aqi": 5 },
                    "components": {
                        "co": 1500.2, "no2": 63.4, "o3": 12.1,
                        "so2": 18.9, "pm2_5": 182.4, "pm10": 240.0
                    }
                },
                {
                    "dt": 1767229200,
                    "main": { "aqi": 4 },
                    "components": { "pm2_5": 95.0 }
                }
            ]
        }"#;
        let samples = parse_samples(body).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].dt, 1_767_225_600);
        assert_eq!(samples[0].components.no2, Some(63.4));
        assert_eq!(samples[1].components.pm10, None);
    }

    #[test]
    fn empty_list_parses_to_no_samples() {
        let samples = parse_samples(r#"{ "list": [] }"#).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn malformed_payload_is_a_json_error() {
        assert!(matches!(
            parse_samples("<html>rate limited</html>"),
            Err(UpstreamError::Json(_))
        ));
    }
}
