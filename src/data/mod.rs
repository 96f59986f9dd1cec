/// Data layer: day discovery, weight extraction, external values, export.
///
/// Architecture:
/// ```text
///   base folder
///        │
///        ▼
///   ┌──────────┐
///   │   days    │  discover YYYYMMDD folders → Vec<DayFolder>
///   └──────────┘
///        │ (user selects a subset)
///        ▼
///   ┌──────────┐            ┌────────────┐
///   │  weight   │            │  external   │  .npy / .pkl / .mat → Vec<f64>
///   └──────────┘            └────────────┘
///        │  Vec<WeightRecord>        │  aligned with the same days
///        ▼                           ▼
///   ┌──────────┐             crate::stats
///   │  export   │  {weights, dates} → .mat / .npy
///   └──────────┘
/// ```

pub mod days;
pub mod error;
pub mod export;
pub mod external;
pub mod model;
pub mod weight;

pub use error::{DataError, Result};
