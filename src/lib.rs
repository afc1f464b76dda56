//! Colorchart filling from point-cloud color samples.
//!
//! Two workflows share this crate:
//!
//! * [`pick`] selects the points inside a square picked on a point cloud and
//!   exports their colors per chart square.
//! * [`fill`] paints a reference chart template with the mean color of each
//!   exported square, inferring the unscanned square with the per-channel
//!   linear model in [`inference`].

pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod fill;
pub mod inference;
pub mod pick;

pub use error::{ChartError, Result};
