use std::path::Path;

use anyhow::{Context, Result};

use super::model::ColorSamples;

/// Write colors as CSV with header `R,G,B`, one row per point, no index column.
///
/// This is the format [`super::loader::load_samples`] reads back.
pub fn write_samples(path: &Path, samples: &ColorSamples) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(["R", "G", "B"]).context("writing CSV header")?;
    for c in &samples.colors {
        writer
            .write_record([c.red.to_string(), c.green.to_string(), c.blue.to_string()])
            .context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;

    log::debug!("wrote {} colors to {}", samples.len(), path.display());
    Ok(())
}
