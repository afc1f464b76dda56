use std::fmt;
use std::str::FromStr;

use palette::Srgb;

use crate::error::{ChartError, Result};

// ---------------------------------------------------------------------------
// SquareId – one labelled cell of the colorchart grid
// ---------------------------------------------------------------------------

/// Grid position of a chart square: row letter plus 1-based column, e.g. `D6`.
///
/// Ordering is row-major so sorted ids read like the printed chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SquareId {
    pub row: char,
    pub col: u32,
}

impl SquareId {
    /// Build an id, normalising the row letter to uppercase.
    pub fn new(row: char, col: u32) -> Result<Self> {
        if !row.is_ascii_alphabetic() || col == 0 {
            return Err(ChartError::InvalidSquareId(format!("{row}{col}")));
        }
        Ok(SquareId {
            row: row.to_ascii_uppercase(),
            col,
        })
    }

    /// Name of the per-square measurement file, `<id>.csv`.
    pub fn file_name(&self) -> String {
        format!("{self}.csv")
    }
}

impl fmt::Display for SquareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.col)
    }
}

impl FromStr for SquareId {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || ChartError::InvalidSquareId(s.to_string());

        let mut chars = s.chars();
        let row = chars.next().ok_or_else(invalid)?;
        let col = chars.as_str().parse::<u32>().map_err(|_| invalid())?;
        SquareId::new(row, col).map_err(|_| invalid())
    }
}

// ---------------------------------------------------------------------------
// ChartValues – the master table of reference colors
// ---------------------------------------------------------------------------

/// One row of the master values file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartEntry {
    pub square: SquareId,
    /// Reference color in display (RGB) order, as painted on the template.
    pub reference: Srgb<u8>,
}

impl ChartEntry {
    /// The single-channel ground truth used as regression input.
    pub fn reference_scalar(&self) -> f64 {
        f64::from(self.reference.red)
    }
}

/// All chart squares in file order.
#[derive(Debug, Clone, Default)]
pub struct ChartValues {
    pub entries: Vec<ChartEntry>,
}

impl ChartValues {
    pub fn new(entries: Vec<ChartEntry>) -> Self {
        ChartValues { entries }
    }

    pub fn get(&self, square: SquareId) -> Option<&ChartEntry> {
        self.entries.iter().find(|e| e.square == square)
    }

    /// Like [`ChartValues::get`] but a missing square is an error.
    pub fn entry(&self, square: SquareId) -> Result<&ChartEntry> {
        self.get(square).ok_or(ChartError::MissingReference(square))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChartEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ColorSamples – colors exported for a single square
// ---------------------------------------------------------------------------

/// Point colors in unit range, one per selected point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorSamples {
    pub colors: Vec<Srgb<f64>>,
}

impl ColorSamples {
    pub fn new(colors: Vec<Srgb<f64>>) -> Self {
        ColorSamples { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Per-channel mean scaled to 0–255 and truncated toward zero.
    ///
    /// Channels outside the unit range saturate at 0 and 255.
    /// Returns `None` for an empty sample set.
    pub fn mean_255(&self) -> Option<Srgb<u8>> {
        if self.colors.is_empty() {
            return None;
        }
        let n = self.colors.len() as f64;
        let (r, g, b) = self.colors.iter().fold((0.0, 0.0, 0.0), |acc, c| {
            (
                acc.0 + c.red * 255.0,
                acc.1 + c.green * 255.0,
                acc.2 + c.blue * 255.0,
            )
        });
        // `as u8` truncates and saturates.
        Some(Srgb::new((r / n) as u8, (g / n) as u8, (b / n) as u8))
    }
}

// ---------------------------------------------------------------------------
// PointCloud – colored XYZ points
// ---------------------------------------------------------------------------

/// A colored point cloud with positions and colors stored side by side.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub positions: Vec<[f64; 3]>,
    /// Unit-range colors, same length as `positions`.
    pub colors: Vec<Srgb<f64>>,
}

impl PointCloud {
    pub fn new(positions: Vec<[f64; 3]>, colors: Vec<Srgb<f64>>) -> Result<Self> {
        if positions.len() != colors.len() {
            return Err(ChartError::MismatchedCloud {
                points: positions.len(),
                colors: colors.len(),
            });
        }
        Ok(PointCloud { positions, colors })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of point `index`, or an error when it is out of range.
    pub fn position(&self, index: usize) -> Result<[f64; 3]> {
        self.positions
            .get(index)
            .copied()
            .ok_or(ChartError::PointOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Gather the colors of the given points.
    pub fn colors_at(&self, indices: &[usize]) -> ColorSamples {
        ColorSamples::new(indices.iter().map(|&i| self.colors[i]).collect())
    }
}
