//! Final index resolution and derived health metrics.
//!
//! Applies the precedence order for picking the reported index: the
//! live-feed provider's own index when present and valid, otherwise the
//! prominent-pollutant index, otherwise a coarse single-pollutant
//! estimate, otherwise the [`AQI_UNAVAILABLE`] sentinel. Callers never
//! see `None` or NaN from this module.

use aqi_monitor_air_models::PollutantReading;

use crate::breakpoints::prominent_index;

/// Sentinel meaning "no index could be resolved". Bands to the
/// `Unknown` category; renderers display it as unavailable rather than
/// as a number.
pub const AQI_UNAVAILABLE: i64 = -1;

/// One cigarette is roughly equivalent to 22 µg/m³·day of PM2.5
/// exposure.
const PM2_5_PER_CIGARETTE: f64 = 22.0;

/// Resolves the final reported index for a ward.
///
/// Precedence:
/// 1. a valid (non-negative) index reported by the live-feed provider;
/// 2. the prominent-pollutant index computed from the reading;
/// 3. a coarse estimate from any single pollutant without a breakpoint
///    formula (SO2 or O3 concentration taken directly as an index
///    proxy);
/// 4. [`AQI_UNAVAILABLE`].
#[must_use]
pub fn resolve(live_feed_index: Option<i64>, reading: &PollutantReading) -> i64 {
    if let Some(index) = live_feed_index
        && index >= 0
    {
        return index;
    }

    if let Some(index) = prominent_index(reading) {
        return index;
    }

    #[allow(clippy::cast_possible_truncation)]
    let coarse = reading
        .so2
        .or(reading.o3)
        .filter(|c| c.is_finite() && *c >= 0.0)
        .map(|c| c.round() as i64);

    coarse.unwrap_or(AQI_UNAVAILABLE)
}

/// Derives the cigarette-equivalence figure, rounded to one decimal.
///
/// Prefers the PM2.5 concentration (`pm2_5 / 22`); when unavailable,
/// falls back to the resolved index as a coarser proxy (`index / 22`).
/// Returns `0.0` when neither is usable.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cigarettes_per_day(pm2_5: Option<f64>, resolved_index: i64) -> f64 {
    let per_day = match pm2_5 {
        Some(c) if c.is_finite() && c >= 0.0 => c / PM2_5_PER_CIGARETTE,
        _ if resolved_index >= 0 => resolved_index as f64 / PM2_5_PER_CIGARETTE,
        _ => 0.0,
    };
    (per_day * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_feed_index_takes_precedence() {
        let reading = PollutantReading {
            pm2_5: Some(65.0),
            ..Default::default()
        };
        assert_eq!(resolve(Some(312), &reading), 312);
    }

    #[test]
    fn invalid_live_feed_index_falls_through() {
        let reading = PollutantReading {
            pm2_5: Some(65.0),
            ..Default::default()
        };
        assert_eq!(resolve(Some(-5), &reading), 117);
        assert_eq!(resolve(None, &reading), 117);
    }

    #[test]
    fn coarse_estimate_from_unmodelled_pollutant() {
        let reading = PollutantReading {
            o3: Some(84.6),
            ..Default::default()
        };
        assert_eq!(resolve(None, &reading), 85);
    }

    #[test]
    fn sentinel_when_nothing_available() {
        assert_eq!(resolve(None, &PollutantReading::default()), AQI_UNAVAILABLE);
    }

    #[test]
    fn cigarettes_from_pm2_5() {
        // 65 / 22 = 2.954... -> 3.0
        let cigs = cigarettes_per_day(Some(65.0), 117);
        assert!((cigs - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cigarettes_fall_back_to_index() {
        let cigs = cigarettes_per_day(None, 220);
        assert!((cigs - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cigarettes_zero_at_sentinel() {
        assert!(cigarettes_per_day(None, AQI_UNAVAILABLE).abs() < f64::EPSILON);
    }
}
