//! CPCB piecewise-linear breakpoint tables and sub-index computation.
//!
//! Each segment maps a concentration range `[low, high]` (µg/m³) onto an
//! index range `[idx_low, idx_high]` by linear interpolation. Above the
//! last PM segment the index extrapolates linearly at one index point
//! per unit of concentration rather than erroring.

use aqi_monitor_air_models::{Pollutant, PollutantReading};

/// One segment of a breakpoint table.
struct Segment {
    c_low: f64,
    c_high: f64,
    i_low: f64,
    i_high: f64,
}

/// CPCB PM2.5 breakpoints (µg/m³ → index).
const PM2_5_TABLE: &[Segment] = &[
    Segment {
        c_low: 0.0,
        c_high: 30.0,
        i_low: 0.0,
        i_high: 50.0,
    },
    Segment {
        c_low: 30.0,
        c_high: 60.0,
        i_low: 50.0,
        i_high: 100.0,
    },
    Segment {
        c_low: 60.0,
        c_high: 90.0,
        i_low: 100.0,
        i_high: 200.0,
    },
    Segment {
        c_low: 90.0,
        c_high: 120.0,
        i_low: 200.0,
        i_high: 300.0,
    },
    Segment {
        c_low: 120.0,
        c_high: 250.0,
        i_low: 300.0,
        i_high: 400.0,
    },
];

/// CPCB PM10 breakpoints (µg/m³ → index).
const PM10_TABLE: &[Segment] = &[
    Segment {
        c_low: 0.0,
        c_high: 50.0,
        i_low: 0.0,
        i_high: 50.0,
    },
    Segment {
        c_low: 50.0,
        c_high: 100.0,
        i_low: 50.0,
        i_high: 100.0,
    },
    Segment {
        c_low: 100.0,
        c_high: 250.0,
        i_low: 100.0,
        i_high: 200.0,
    },
    Segment {
        c_low: 250.0,
        c_high: 350.0,
        i_low: 200.0,
        i_high: 300.0,
    },
    Segment {
        c_low: 350.0,
        c_high: 430.0,
        i_low: 300.0,
        i_high: 400.0,
    },
];

/// CPCB NO2 breakpoints (µg/m³ → index).
///
/// Only the first three segments are modelled. Above 180 µg/m³ the
/// simplified model returns 0, a known limitation: the higher CPCB
/// segments are not encoded here and must not be inferred.
const NO2_TABLE: &[Segment] = &[
    Segment {
        c_low: 0.0,
        c_high: 40.0,
        i_low: 0.0,
        i_high: 50.0,
    },
    Segment {
        c_low: 40.0,
        c_high: 80.0,
        i_low: 50.0,
        i_high: 100.0,
    },
    Segment {
        c_low: 80.0,
        c_high: 180.0,
        i_low: 100.0,
        i_high: 200.0,
    },
];

/// Linear interpolation within the first segment whose upper bound
/// covers `concentration`, or `None` when the concentration is above the
/// table.
fn interpolate(concentration: f64, table: &[Segment]) -> Option<f64> {
    table
        .iter()
        .find(|seg| concentration <= seg.c_high)
        .map(|seg| {
            seg.i_low
                + (concentration - seg.c_low) * (seg.i_high - seg.i_low) / (seg.c_high - seg.c_low)
        })
}

/// Computes the sub-index for a single pollutant concentration.
///
/// Returns `None` when the concentration is absent, negative, or NaN, or
/// when no breakpoint formula is defined for the pollutant (SO2, CO, O3
/// in this model).
#[must_use]
pub fn sub_index(pollutant: Pollutant, concentration: Option<f64>) -> Option<i64> {
    let c = concentration?;
    if !c.is_finite() || c < 0.0 {
        return None;
    }

    #[allow(clippy::cast_possible_truncation)]
    let round = |idx: f64| idx.round() as i64;

    match pollutant {
        Pollutant::Pm2_5 => Some(round(
            interpolate(c, PM2_5_TABLE).unwrap_or(400.0 + (c - 250.0)),
        )),
        Pollutant::Pm10 => Some(round(
            interpolate(c, PM10_TABLE).unwrap_or(400.0 + (c - 430.0)),
        )),
        Pollutant::No2 => Some(round(interpolate(c, NO2_TABLE).unwrap_or(0.0))),
        Pollutant::So2 | Pollutant::Co | Pollutant::O3 => None,
    }
}

/// Computes the prominent-pollutant index for a reading: the maximum of
/// the defined sub-indices, or `None` when no sub-index is computable.
#[must_use]
pub fn prominent_index(reading: &PollutantReading) -> Option<i64> {
    Pollutant::all()
        .into_iter()
        .filter_map(|p| sub_index(p, reading.get(p)))
        .max()
}
