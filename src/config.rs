//! Run configuration for the `fill` and `pick` commands.
//!
//! Defaults reproduce the directory layout the chart workflow has always used
//! (`color_checker/` for the template, `test_data/` for measurements), so the
//! commands run without any flags from a prepared working directory. A JSON
//! file may override any subset of fields:
//!
//! ```json
//! { "data_dir": "scans/2024-05-02", "output": "out/chart.png" }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Inputs and output of `colorchart fill`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Reference template image with one solid color per square.
    pub template: PathBuf,
    /// Master CSV: `row,col,R,G,B`.
    pub values: PathBuf,
    /// Directory holding `<square>.csv` measurements.
    pub data_dir: PathBuf,
    /// Where the recolored chart is written.
    pub output: PathBuf,
}

impl Default for FillConfig {
    fn default() -> Self {
        FillConfig {
            template: PathBuf::from("color_checker/color_checker_ref.png"),
            values: PathBuf::from("color_checker/color_checker_values.csv"),
            data_dir: PathBuf::from("test_data"),
            output: PathBuf::from("fake_color_checker.png"),
        }
    }
}

/// Inputs and output of `colorchart pick`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickConfig {
    pub cloud: PathBuf,
    /// Output stem; the CSV is written to `<out_dir>/<name>.csv`.
    pub name: String,
    pub out_dir: PathBuf,
}

impl Default for PickConfig {
    fn default() -> Self {
        PickConfig {
            cloud: PathBuf::from("test_data/pointcloud_b.ply"),
            name: "output".to_string(),
            out_dir: PathBuf::from("."),
        }
    }
}

/// Read a JSON config; absent fields keep their defaults.
pub fn from_json_file<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fill.json");
        std::fs::write(&path, r#"{ "data_dir": "scans" }"#).unwrap();

        let cfg: FillConfig = from_json_file(&path).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("scans"));
        assert_eq!(cfg.template, FillConfig::default().template);
        assert_eq!(cfg.output, PathBuf::from("fake_color_checker.png"));
    }

    #[test]
    fn pick_defaults() {
        let cfg = PickConfig::default();
        assert_eq!(cfg.name, "output");
        assert_eq!(cfg.out_dir, PathBuf::from("."));
    }

    #[test]
    fn malformed_config_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = from_json_file::<PickConfig>(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }
}
