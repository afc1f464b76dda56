use thiserror::Error;

use crate::data::model::SquareId;

/// Result alias for the chart operations that carry a domain error.
pub type Result<T> = std::result::Result<T, ChartError>;

/// Failures with a meaning beyond "a file could not be read".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("invalid square id '{0}' (expected a row letter followed by a column number, e.g. D6)")]
    InvalidSquareId(String),

    #[error("square {0} is not listed in the chart values")]
    MissingReference(SquareId),

    #[error("no color samples in {0}")]
    EmptySamples(String),

    #[error("a linear fit needs at least {needed} samples, got {found}")]
    InsufficientSamples { needed: usize, found: usize },

    #[error("{xs} reference values but {ys} measurements")]
    MismatchedSamples { xs: usize, ys: usize },

    /// All reference scalars are equal, so no unique line exists.
    #[error("reference values do not vary, cannot fit a line")]
    DegenerateReference,

    #[error("point cloud has {points} positions but {colors} colors")]
    MismatchedCloud { points: usize, colors: usize },

    #[error("not exactly four points selected ({0} given), cannot process this as a square")]
    CornerCount(usize),

    #[error("picked point {index} is out of range for a cloud of {len} points")]
    PointOutOfRange { index: usize, len: usize },

    #[error("image buffer of {len} bytes does not match {width}x{height} pixels")]
    CanvasSize { width: u32, height: u32, len: usize },
}
