//! AQICN (World Air Quality Index project) live feed client.
//!
//! Fetches the station observation nearest to a coordinate via the
//! geolocated feed endpoint. The payload wraps everything in a
//! `status`/`data` envelope; `iaqi` holds per-pollutant station values
//! keyed `pm25`, `pm10`, `no2`, `so2`, `co`, `o3`, each as `{ "v": n }`.

use aqi_monitor_air_models::PollutantReading;
use async_trait::async_trait;
use serde::Deserialize;

use crate::{LiveFeed, LiveFeedSource, UpstreamError};

/// Default AQICN API base URL.
const DEFAULT_BASE_URL: &str = "https://api.waqi.info";

/// AQICN geolocated feed client.
pub struct AqicnClient {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl AqicnClient {
    /// Creates a client using the production API base URL.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL.to_string())
    }

    /// Creates a client against a custom base URL.
    #[must_use]
    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            token,
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

/// Envelope around every AQICN response.
#[derive(Deserialize)]
struct FeedEnvelope {
    status: String,
    #[serde(default)]
    data: Option<FeedData>,
}

#[derive(Deserialize)]
struct FeedData {
    /// The provider's pre-computed index. Occasionally the string `"-"`
    /// instead of a number, so parsed leniently.
    #[serde(default)]
    aqi: serde_json::Value,
    #[serde(default)]
    iaqi: Option<Iaqi>,
    #[serde(default)]
    city: Option<FeedCity>,
    #[serde(default)]
    time: Option<FeedTime>,
}

#[derive(Deserialize)]
struct Iaqi {
    #[serde(default)]
    pm25: Option<IaqiValue>,
    #[serde(default)]
    pm10: Option<IaqiValue>,
    #[serde(default)]
    no2: Option<IaqiValue>,
    #[serde(default)]
    so2: Option<IaqiValue>,
    #[serde(default)]
    co: Option<IaqiValue>,
    #[serde(default)]
    o3: Option<IaqiValue>,
}

#[derive(Deserialize)]
struct IaqiValue {
    v: f64,
}

#[derive(Deserialize)]
struct FeedCity {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct FeedTime {
    #[serde(default)]
    s: Option<String>,
}

/// Parses an AQICN feed envelope into a [`LiveFeed`].
///
/// # Errors
///
/// Returns [`UpstreamError::Malformed`] when the envelope status is not
/// `"ok"` or the data block is missing.
pub fn parse_feed(body: &str) -> Result<LiveFeed, UpstreamError> {
    let envelope: FeedEnvelope = serde_json::from_str(body)?;

    if envelope.status != "ok" {
        return Err(UpstreamError::Malformed {
            message: format!("feed status was '{}'", envelope.status),
        });
    }

    let data = envelope.data.ok_or_else(|| UpstreamError::Malformed {
        message: "feed envelope missing data block".to_string(),
    })?;

    // `aqi` can be a number or the placeholder string "-".
    #[allow(clippy::cast_possible_truncation)]
    let aqi = match &data.aqi {
        serde_json::Value::Number(n) => n.as_f64().map(|v| v.round() as i64),
        _ => None,
    };

    let reading = data.iaqi.map_or_else(PollutantReading::default, |iaqi| {
        PollutantReading {
            pm2_5: iaqi.pm25.map(|v| v.v),
            pm10: iaqi.pm10.map(|v| v.v),
            no2: iaqi.no2.map(|v| v.v),
            so2: iaqi.so2.map(|v| v.v),
            co: iaqi.co.map(|v| v.v),
            o3: iaqi.o3.map(|v| v.v),
        }
    });

    Ok(LiveFeed {
        aqi,
        station: data.city.and_then(|c| c.name),
        observed_at: data.time.and_then(|t| t.s),
        reading,
    })
}

#[async_trait]
impl LiveFeedSource for AqicnClient {
    async fn fetch(&self, lat: f64, lon: f64) -> Result<LiveFeed, UpstreamError> {
        let url = format!("{}/feed/geo:{lat};{lon}/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_feed(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ok_feed() {
        let body = r#"{
            "status": "ok",
            "data": {
                "aqi": 182,
                "city": { "name": "Anand Vihar, Delhi", "geo": [28.6469, 77.3162] },
                "time": { "s": "2026-01-12 14:00:00" },
                "iaqi": {
                    "pm25": { "v": 182.0 },
                    "pm10": { "v": 140.0 },
                    "no2": { "v": 31.5 }
                }
            }
        }"#;
        let feed = parse_feed(body).unwrap();
        assert_eq!(feed.aqi, Some(182));
        assert_eq!(feed.station.as_deref(), Some("Anand Vihar, Delhi"));
        assert_eq!(feed.reading.pm2_5, Some(182.0));
        assert_eq!(feed.reading.o3, None);
    }

    #[test]
    fn placeholder_aqi_parses_as_none() {
        let body = r#"{ "status": "ok", "data": { "aqi": "-", "iaqi": {} } }"#;
        let feed = parse_feed(body).unwrap();
        assert_eq!(feed.aqi, None);
    }

    #[test]
    fn error_status_is_malformed() {
        let body = r#"{ "status": "error", "data": null }"#;
        assert!(matches!(
            parse_feed(body),
            Err(UpstreamError::Malformed { .. })
        ));
    }
}
