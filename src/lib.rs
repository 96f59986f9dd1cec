//! Per-day weight tracking.
//!
//! [`data`] turns a folder of experiment days into aligned weight and
//! external-value series; [`stats`] classifies outliers and correlates the
//! two series. The desktop viewer in `main.rs` is a thin shell over both.

pub mod data;
pub mod stats;
