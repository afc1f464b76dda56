//! Fill the chart template with measured colors.
//!
//! Every square listed in the chart values is looked up as
//! `<data_dir>/<square>.csv`. Squares without a measurement keep their
//! reference color, except [`INFERRED_SQUARE`], which is predicted from the
//! other squares of its row.

use std::path::Path;

use anyhow::{Context, Result};
use palette::Srgb;

use crate::chart::ChartCanvas;
use crate::color::{hex, saturate};
use crate::config::FillConfig;
use crate::data::loader::{load_chart_values, load_samples};
use crate::data::model::{ChartValues, SquareId};
use crate::error::ChartError;
use crate::inference::{ColorModel, Sample, FIT_SAMPLES};

/// The square that is never scanned and is inferred when its data is missing.
pub const INFERRED_SQUARE: SquareId = SquareId { row: 'D', col: 6 };

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorSource {
    /// Mean of this many exported point colors.
    Measured { samples: usize },
    Inferred,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recolored {
    pub square: SquareId,
    pub color: Srgb<u8>,
    pub source: ColorSource,
    /// Template pixels that matched the reference color.
    pub pixels: usize,
}

/// Outcome of a linear-gradient inference.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub square: SquareId,
    /// Squares the model was fitted on, with their samples.
    pub fitted: Vec<(SquareId, Sample)>,
    pub model: ColorModel,
    /// Reference scalar the model was evaluated at.
    pub reference: f64,
    pub color: Srgb<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillReport {
    pub recolored: Vec<Recolored>,
    pub skipped: Vec<SquareId>,
    pub inference: Option<Inference>,
}

// ---------------------------------------------------------------------------
// Measurement and inference
// ---------------------------------------------------------------------------

/// Mean color of a square's measurement file and the number of samples.
pub fn measured_color(data_dir: &Path, square: SquareId) -> Result<(Srgb<u8>, usize)> {
    let path = data_dir.join(square.file_name());
    let samples = load_samples(&path)?;
    let mean = samples
        .mean_255()
        .ok_or_else(|| ChartError::EmptySamples(path.display().to_string()))?;
    Ok((mean, samples.len()))
}

/// Predict `target` from columns `1..=5` of its row.
///
/// The reference scalar of each square is the red channel of its reference
/// color. Measurements are truncated to integers before fitting. A missing
/// measurement for any of the fitted squares is an error.
pub fn infer_square(values: &ChartValues, data_dir: &Path, target: SquareId) -> Result<Inference> {
    let mut fitted = Vec::with_capacity(FIT_SAMPLES);
    for col in 1..=FIT_SAMPLES as u32 {
        let square = SquareId::new(target.row, col)?;
        let x = values.entry(square)?.reference_scalar();
        let (mean, _) = measured_color(data_dir, square)
            .with_context(|| format!("square {square} is needed to infer {target}"))?;
        let color = [mean.red, mean.green, mean.blue].map(f64::from);
        fitted.push((square, Sample::new(x, color)));
    }

    let samples: Vec<Sample> = fitted.iter().map(|(_, s)| *s).collect();
    let model = ColorModel::fit(&samples)?;

    let reference = values.entry(target)?.reference_scalar();
    let raw = model.predict_raw(reference);
    let color = saturate(model.predict(reference));
    log::info!(
        "Predicted {target}: [{:.2}, {:.2}, {:.2}] -> {}",
        raw[0],
        raw[1],
        raw[2],
        hex(color)
    );

    Ok(Inference {
        square: target,
        fitted,
        model,
        reference,
        color,
    })
}

// ---------------------------------------------------------------------------
// Chart filling
// ---------------------------------------------------------------------------

/// Recolor `canvas` square by square, in chart-values order.
///
/// Each reference color is matched against the canvas as already recolored
/// by the earlier squares. A square whose new color equals a later square's
/// reference is therefore recolored again by that later square.
pub fn fill_canvas(
    canvas: &mut ChartCanvas,
    values: &ChartValues,
    data_dir: &Path,
) -> Result<FillReport> {
    let mut report = FillReport::default();

    for entry in values.iter() {
        let square = entry.square;
        let data_file = data_dir.join(square.file_name());

        let (color, source) = if data_file.is_file() {
            let (color, samples) = measured_color(data_dir, square)?;
            (color, ColorSource::Measured { samples })
        } else if square == INFERRED_SQUARE {
            log::info!("No data found for {square}, applying linear gradient");
            let inference = infer_square(values, data_dir, square)?;
            let color = inference.color;
            report.inference = Some(inference);
            (color, ColorSource::Inferred)
        } else {
            log::warn!("{} does not exist. Skipping {square}.", data_file.display());
            report.skipped.push(square);
            continue;
        };

        let pixels = canvas.replace(entry.reference, color);
        log::debug!(
            "{square}: {} -> {} ({pixels} px)",
            hex(entry.reference),
            hex(color)
        );
        if pixels == 0 {
            log::warn!(
                "reference color {} of {square} does not occur in the template",
                hex(entry.reference)
            );
        }

        report.recolored.push(Recolored {
            square,
            color,
            source,
            pixels,
        });
    }

    Ok(report)
}

/// Load the template and values, fill, and write the output image.
pub fn run(config: &FillConfig) -> Result<FillReport> {
    let values = load_chart_values(&config.values)?;
    let mut canvas = ChartCanvas::load(&config.template)?;

    let report = fill_canvas(&mut canvas, &values, &config.data_dir)?;

    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    canvas.save(&config.output)?;
    log::info!(
        "Recolored {} squares ({} skipped), saved {}",
        report.recolored.len(),
        report.skipped.len(),
        config.output.display()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::data::model::ChartEntry;

    fn sq(s: &str) -> SquareId {
        s.parse().unwrap()
    }

    /// Row D with reference scalars 200, 160, 120, 80, 40, 20.
    fn gray_row() -> ChartValues {
        let refs = [200u8, 160, 120, 80, 40, 20];
        ChartValues::new(
            refs.iter()
                .enumerate()
                .map(|(i, &v)| ChartEntry {
                    square: SquareId::new('D', i as u32 + 1).unwrap(),
                    reference: Srgb::new(v, v, v.saturating_sub(1)),
                })
                .collect(),
        )
    }

    fn write_samples(dir: &Path, square: &str, rows: &[[f64; 3]]) {
        let mut text = String::from("R,G,B\n");
        for [r, g, b] in rows {
            text.push_str(&format!("{r},{g},{b}\n"));
        }
        std::fs::write(dir.join(format!("{square}.csv")), text).unwrap();
    }

    #[test]
    fn measured_color_is_truncated_mean() {
        let dir = TempDir::new().unwrap();
        write_samples(dir.path(), "A1", &[[0.5, 0.0, 1.0], [0.6, 0.1, 1.0]]);

        let (color, n) = measured_color(dir.path(), sq("A1")).unwrap();
        // R: (127.5 + 153) / 2 = 140.25, G: 12.75
        assert_eq!(color, Srgb::new(140, 12, 255));
        assert_eq!(n, 2);
    }

    #[test]
    fn empty_measurement_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("A1.csv"), "R,G,B\n").unwrap();
        let err = measured_color(dir.path(), sq("A1")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChartError>(),
            Some(ChartError::EmptySamples(_))
        ));
    }

    #[test]
    fn infers_from_row_gradient() {
        let dir = TempDir::new().unwrap();
        // Measured value = reference / 255 * 0.5, i.e. half brightness.
        for (col, v) in [(1, 200.0), (2, 160.0), (3, 120.0), (4, 80.0), (5, 40.0)] {
            let unit = v / 2.0 / 255.0;
            write_samples(dir.path(), &format!("D{col}"), &[[unit, unit, unit]]);
        }

        let inference = infer_square(&gray_row(), dir.path(), INFERRED_SQUARE).unwrap();
        assert_eq!(inference.fitted.len(), FIT_SAMPLES);
        assert_relative_eq!(inference.reference, 20.0);
        for c in inference.model.channels {
            assert_relative_eq!(c.slope, 0.5, epsilon = 1e-2);
        }
        // 20 / 2 = 10, allowing one step of truncation in the measurements.
        assert!((9..=10).contains(&inference.color.red));
    }

    #[test]
    fn inference_needs_every_fitted_square() {
        let dir = TempDir::new().unwrap();
        for col in [1, 2, 4, 5] {
            write_samples(dir.path(), &format!("D{col}"), &[[0.5, 0.5, 0.5]]);
        }
        let err = infer_square(&gray_row(), dir.path(), INFERRED_SQUARE).unwrap_err();
        assert!(format!("{err:#}").contains("square D3 is needed to infer D6"));
    }

    #[test]
    fn missing_square_is_skipped_and_left_untouched() {
        let dir = TempDir::new().unwrap();
        let values = ChartValues::new(vec![
            ChartEntry {
                square: sq("A1"),
                reference: Srgb::new(200, 10, 10),
            },
            ChartEntry {
                square: sq("A2"),
                reference: Srgb::new(10, 200, 10),
            },
        ]);
        let mut canvas = ChartCanvas::filled(4, 2, Srgb::new(0, 0, 0));
        canvas.fill_rect(0, 0, 2, 2, Srgb::new(200, 10, 10));
        canvas.fill_rect(2, 0, 2, 2, Srgb::new(10, 200, 10));
        write_samples(dir.path(), "A1", &[[0.0, 0.0, 1.0]]);

        let report = fill_canvas(&mut canvas, &values, dir.path()).unwrap();

        assert_eq!(report.skipped, vec![sq("A2")]);
        assert_eq!(report.recolored.len(), 1);
        assert_eq!(report.recolored[0].pixels, 4);
        assert_eq!(
            report.recolored[0].source,
            ColorSource::Measured { samples: 1 }
        );
        assert_eq!(canvas.color_at(0, 0), Some(Srgb::new(0, 0, 255)));
        assert_eq!(canvas.color_at(3, 1), Some(Srgb::new(10, 200, 10)));
        assert!(report.inference.is_none());
    }

    #[test]
    fn measured_inferred_square_is_not_inferred() {
        let dir = TempDir::new().unwrap();
        let values = ChartValues::new(vec![ChartEntry {
            square: INFERRED_SQUARE,
            reference: Srgb::new(20, 20, 19),
        }]);
        let mut canvas = ChartCanvas::filled(1, 1, Srgb::new(20, 20, 19));
        write_samples(dir.path(), "D6", &[[0.0, 0.0, 0.0]]);

        let report = fill_canvas(&mut canvas, &values, dir.path()).unwrap();
        assert!(report.inference.is_none());
        assert_eq!(canvas.color_at(0, 0), Some(Srgb::new(0, 0, 0)));
    }

    #[test]
    fn later_reference_matches_earlier_replacement() {
        let dir = TempDir::new().unwrap();
        let values = ChartValues::new(vec![
            ChartEntry {
                square: sq("A1"),
                reference: Srgb::new(200, 200, 200),
            },
            ChartEntry {
                square: sq("A2"),
                reference: Srgb::new(100, 100, 100),
            },
        ]);
        let mut canvas = ChartCanvas::filled(4, 2, Srgb::new(0, 0, 0));
        canvas.fill_rect(0, 0, 2, 2, Srgb::new(200, 200, 200));
        canvas.fill_rect(2, 0, 2, 2, Srgb::new(100, 100, 100));
        // A1 measures exactly A2's reference, A2 measures 50.
        let (a1, a2) = (100.0 / 255.0, 50.0 / 255.0);
        write_samples(dir.path(), "A1", &[[a1, a1, a1]]);
        write_samples(dir.path(), "A2", &[[a2, a2, a2]]);

        let report = fill_canvas(&mut canvas, &values, dir.path()).unwrap();

        assert_eq!(report.recolored[0].color, Srgb::new(100, 100, 100));
        assert_eq!(report.recolored[0].pixels, 4);
        // A2 also picks up the pixels A1 was just painted with.
        assert_eq!(report.recolored[1].color, Srgb::new(50, 50, 50));
        assert_eq!(report.recolored[1].pixels, 8);
        assert_eq!(canvas.color_at(0, 0), Some(Srgb::new(50, 50, 50)));
        assert_eq!(canvas.color_at(3, 1), Some(Srgb::new(50, 50, 50)));
    }
}
