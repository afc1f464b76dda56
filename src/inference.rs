//! Per-channel linear regression used to infer a chart square that was
//! never measured.
//!
//! Each of the R, G and B channels gets its own least-squares line
//! `y = slope·x + intercept`, where `x` is the square's reference scalar and
//! `y` the measured channel value (0–255).

use crate::error::{ChartError, Result};

/// Channel labels in display order, used for logging.
pub const CHANNEL_NAMES: [&str; 3] = ["R", "G", "B"];

/// Number of measured squares a chart inference is fitted on.
pub const FIT_SAMPLES: usize = 5;

// ---------------------------------------------------------------------------
// Sample – one (reference, measurement) pair
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Reference scalar (independent variable).
    pub x: f64,
    /// Measured color in display order, 0–255.
    pub color: [f64; 3],
}

impl Sample {
    pub fn new(x: f64, color: [f64; 3]) -> Self {
        Sample { x, color }
    }
}

// ---------------------------------------------------------------------------
// ChannelModel – least-squares line for a single channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelModel {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; NaN when the channel has zero variance.
    pub r_squared: f64,
}

impl ChannelModel {
    /// Fit `y = slope·x + intercept` by ordinary least squares.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(ChartError::MismatchedSamples {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        if xs.len() < 2 {
            return Err(ChartError::InsufficientSamples {
                needed: 2,
                found: xs.len(),
            });
        }

        let x_mean = mean(xs);
        let y_mean = mean(ys);
        let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
        let sxy: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (x - x_mean) * (y - y_mean))
            .sum();
        if sxx == 0.0 {
            return Err(ChartError::DegenerateReference);
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let ss_res: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
            .sum();
        let ss_tot: f64 = ys.iter().map(|y| (y - y_mean).powi(2)).sum();
        let r_squared = if ss_tot != 0.0 {
            1.0 - ss_res / ss_tot
        } else {
            f64::NAN
        };

        Ok(ChannelModel {
            slope,
            intercept,
            r_squared,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

// ---------------------------------------------------------------------------
// ColorModel – three independent channel fits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorModel {
    pub channels: [ChannelModel; 3],
}

impl ColorModel {
    /// Fit every channel independently over the same reference scalars.
    pub fn fit(samples: &[Sample]) -> Result<Self> {
        let xs: Vec<f64> = samples.iter().map(|s| s.x).collect();
        let mut channels = [ChannelModel {
            slope: 0.0,
            intercept: 0.0,
            r_squared: f64::NAN,
        }; 3];

        for (i, model) in channels.iter_mut().enumerate() {
            let ys: Vec<f64> = samples.iter().map(|s| s.color[i]).collect();
            *model = ChannelModel::fit(&xs, &ys)?;
            log::info!("R² of fit for {}: {:.3}", CHANNEL_NAMES[i], model.r_squared);
        }

        Ok(ColorModel { channels })
    }

    /// Raw line values at `x`, may be negative.
    pub fn predict_raw(&self, x: f64) -> [f64; 3] {
        self.channels.map(|c| c.predict(x))
    }

    /// Prediction clamped to be non-negative and truncated to integers.
    pub fn predict(&self, x: f64) -> [u32; 3] {
        // `as u32` truncates toward zero.
        self.predict_raw(x).map(|v| v.max(0.0) as u32)
    }
}
