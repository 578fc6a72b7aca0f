//! Parallel upstream fan-out and series shaping.
//!
//! Issues the four upstream calls (live feed, current, history,
//! forecast) concurrently, each under its own deadline, and settles
//! every branch independently: a timeout or failure in one branch is
//! recorded in that branch's `Result` and never short-circuits the
//! others.

use std::time::Duration;

use aqi_monitor_air_models::{PollutantReading, TimeSeriesPoint};
use aqi_monitor_aqi::prominent_index;
use chrono::{FixedOffset, TimeZone, Utc};

use crate::{LiveFeed, LiveFeedSource, PollutantSource, RawSample, UpstreamError};

/// Per-branch deadline for each upstream call.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(8);

/// Maximum number of points kept per history/forecast series.
pub const SERIES_LEN: usize = 24;

/// IST (+05:30), the deployment region's local offset for series labels.
const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 1800;

/// The settled outcome of all four upstream branches.
///
/// Each branch is an independent `Result`; callers degrade per-branch
/// instead of failing the whole request.
#[derive(Debug)]
pub struct GatherOutcome {
    /// Station live feed.
    pub live: Result<LiveFeed, UpstreamError>,
    /// Current pollutant concentrations.
    pub current: Result<PollutantReading, UpstreamError>,
    /// Hourly history samples (raw, untruncated).
    pub history: Result<Vec<RawSample>, UpstreamError>,
    /// Hourly forecast samples (raw, untruncated).
    pub forecast: Result<Vec<RawSample>, UpstreamError>,
}

/// Runs a branch under the shared per-branch deadline, mapping an
/// elapsed timer to [`UpstreamError::Timeout`].
async fn settle<T, F>(fut: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(UPSTREAM_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout),
    }
}

/// Fans out to all four upstream calls concurrently and waits for every
/// branch to settle.
///
/// The history window requested is the trailing 24 hours ending now.
pub async fn gather(
    live_feed: &dyn LiveFeedSource,
    pollutants: &dyn PollutantSource,
    lat: f64,
    lon: f64,
) -> GatherOutcome {
    let now = Utc::now().timestamp();
    let day_ago = now - 24 * 3600;

    let (live, current, history, forecast) = tokio::join!(
        settle(live_feed.fetch(lat, lon)),
        settle(pollutants.current(lat, lon)),
        settle(pollutants.history(lat, lon, day_ago, now)),
        settle(pollutants.forecast(lat, lon)),
    );

    if let Err(e) = &live {
        log::warn!("Live feed branch failed: {e}");
    }
    if let Err(e) = &current {
        log::warn!("Current pollutants branch failed: {e}");
    }
    if let Err(e) = &history {
        log::warn!("History branch failed: {e}");
    }
    if let Err(e) = &forecast {
        log::warn!("Forecast branch failed: {e}");
    }

    GatherOutcome {
        live,
        current,
        history,
        forecast,
    }
}

/// Shapes history samples into the trailing-24 series.
///
/// Each point's index is computed from that point's own concentrations —
/// a flat line across the series would be a defect.
#[must_use]
pub fn history_series(samples: &[RawSample]) -> Vec<TimeSeriesPoint> {
    let start = samples.len().saturating_sub(SERIES_LEN);
    samples[start..].iter().map(to_point).collect()
}

/// Shapes forecast samples into the leading-24 series.
#[must_use]
pub fn forecast_series(samples: &[RawSample]) -> Vec<TimeSeriesPoint> {
    samples.iter().take(SERIES_LEN).map(to_point).collect()
}

fn to_point(sample: &RawSample) -> TimeSeriesPoint {
    TimeSeriesPoint {
        time: format_local_time(sample.dt),
        aqi: prominent_index(&sample.components),
        pm2_5: sample.components.pm2_5,
        pm10: sample.components.pm10,
    }
}

/// Formats a Unix timestamp as an IST time-of-day label.
fn format_local_time(dt: i64) -> String {
    FixedOffset::east_opt(IST_OFFSET_SECONDS)
        .and_then(|offset| offset.timestamp_opt(dt, 0).single())
        .map_or_else(|| dt.to_string(), |t| t.format("%H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct FailingFeed;

    #[async_trait]
    impl LiveFeedSource for FailingFeed {
        async fn fetch(&self, _lat: f64, _lon: f64) -> Result<LiveFeed, UpstreamError> {
            Err(UpstreamError::Status { code: 503 })
        }
    }

    struct SlowFeed;

    #[async_trait]
    impl LiveFeedSource for SlowFeed {
        async fn fetch(&self, _lat: f64, _lon: f64) -> Result<LiveFeed, UpstreamError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(LiveFeed::default())
        }
    }

    /// Pollutant source where only `current` succeeds.
    struct CurrentOnly;

    #[async_trait]
    impl PollutantSource for CurrentOnly {
        async fn current(&self, _lat: f64, _lon: f64) -> Result<PollutantReading, UpstreamError> {
            Ok(PollutantReading {
                pm2_5: Some(65.0),
                ..Default::default()
            })
        }

        async fn history(
            &self,
            _lat: f64,
            _lon: f64,
            _from: i64,
            _to: i64,
        ) -> Result<Vec<RawSample>, UpstreamError> {
            Err(UpstreamError::Malformed {
                message: "truncated".to_string(),
            })
        }

        async fn forecast(&self, _lat: f64, _lon: f64) -> Result<Vec<RawSample>, UpstreamError> {
            Err(UpstreamError::Status { code: 500 })
        }
    }

    #[tokio::test]
    async fn one_success_survives_three_failures() {
        let outcome = gather(&FailingFeed, &CurrentOnly, 28.6, 77.2).await;

        assert!(outcome.live.is_err());
        assert!(outcome.history.is_err());
        assert!(outcome.forecast.is_err());

        let current = outcome.current.unwrap();
        assert_eq!(current.pm2_5, Some(65.0));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_branch_times_out_without_stalling_others() {
        let outcome = gather(&SlowFeed, &CurrentOnly, 28.6, 77.2).await;

        assert!(matches!(outcome.live, Err(UpstreamError::Timeout)));
        assert!(outcome.current.is_ok());
    }

    fn sample(dt: i64, pm2_5: f64) -> RawSample {
        RawSample {
            dt,
            components: PollutantReading {
                pm2_5: Some(pm2_5),
                ..Default::default()
            },
        }
    }

    #[test]
    fn history_keeps_trailing_24_with_per_point_indices() {
        let samples: Vec<RawSample> = (0..30)
            .map(|i| sample(1_767_225_600 + i * 3600, 30.0 + i as f64))
            .collect();

        let series = history_series(&samples);
        assert_eq!(series.len(), SERIES_LEN);

        // Trailing window: first kept sample is the 7th (pm2.5 = 36).
        assert_eq!(series[0].pm2_5, Some(36.0));

        // Each point reflects its own concentrations, not a flat line.
        let distinct: std::collections::BTreeSet<Option<i64>> =
            series.iter().map(|p| p.aqi).collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn forecast_keeps_leading_24() {
        let samples: Vec<RawSample> = (0..30)
            .map(|i| sample(1_767_225_600 + i * 3600, 60.0 + i as f64))
            .collect();

        let series = forecast_series(&samples);
        assert_eq!(series.len(), SERIES_LEN);
        assert_eq!(series[0].pm2_5, Some(60.0));
        assert_eq!(series[23].pm2_5, Some(83.0));
    }

    #[test]
    fn short_series_pass_through_untruncated() {
        let samples = vec![sample(1_767_225_600, 45.0)];
        assert_eq!(history_series(&samples).len(), 1);
        assert_eq!(forecast_series(&samples).len(), 1);
    }
}
