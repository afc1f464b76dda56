//! Data layer: core types, loading, selection and export.
//!
//! Architecture:
//! ```text
//!  .parquet / .json / .csv             values.csv    <square>.csv
//!        │                                  │             │
//!        ▼                                  ▼             ▼
//!   ┌──────────┐                       ┌──────────────────────┐
//!   │  loader   │  parse → PointCloud   │ loader → ChartValues, │
//!   └──────────┘                       │          ColorSamples │
//!        │                              └──────────────────────┘
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  XY footprint of picked corners → point indices
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  export   │  selected colors → <square>.csv
//!   └──────────┘
//! ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
