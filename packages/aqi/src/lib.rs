#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CPCB air-quality index computation.
//!
//! Pure functions only — no I/O, no state. [`breakpoints`] converts raw
//! pollutant concentrations into per-pollutant sub-indices via the CPCB
//! piecewise-linear breakpoint tables and combines them into the
//! prominent-pollutant index. [`resolve`] applies the precedence order
//! that picks the final reported index for a ward and derives the
//! cigarette-equivalence figure.

pub mod breakpoints;
pub mod resolve;

pub use breakpoints::{prominent_index, sub_index};
pub use resolve::{AQI_UNAVAILABLE, cigarettes_per_day, resolve};
