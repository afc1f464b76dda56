use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array};
use arrow::datatypes::DataType;
use palette::Srgb;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use serde::Deserialize;

use super::model::{ChartEntry, ChartValues, ColorSamples, PointCloud, SquareId};

// ---------------------------------------------------------------------------
// Chart values (master CSV)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartRecord {
    row: String,
    col: u32,
    #[serde(rename = "R")]
    r: u8,
    #[serde(rename = "G")]
    g: u8,
    #[serde(rename = "B")]
    b: u8,
}

/// Load the master table of chart squares.
///
/// CSV layout: header `row,col,R,G,B` (any order, extra columns ignored),
/// one square per line, reference colors as integers 0–255:
///
/// ```text
/// row,col,R,G,B
/// A,1,115,82,68
/// ```
pub fn load_chart_values(path: &Path) -> Result<ChartValues> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening chart values {}", path.display()))?;

    let mut entries = Vec::new();
    for (row_no, result) in reader.deserialize::<ChartRecord>().enumerate() {
        let rec = result.with_context(|| format!("chart values row {row_no}"))?;
        let square = format!("{}{}", rec.row.trim(), rec.col)
            .parse::<SquareId>()
            .with_context(|| format!("chart values row {row_no}"))?;
        entries.push(ChartEntry {
            square,
            reference: Srgb::new(rec.r, rec.g, rec.b),
        });
    }

    log::debug!("loaded {} chart squares from {}", entries.len(), path.display());
    Ok(ChartValues::new(entries))
}

// ---------------------------------------------------------------------------
// Per-square color samples
// ---------------------------------------------------------------------------

/// Load the colors exported for one square.
///
/// The header must contain `R`, `G` and `B`; other columns are ignored.
/// Values are unit-range floats.
pub fn load_samples(path: &Path) -> Result<ColorSamples> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening samples {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = [
        column_index(&headers, "R")?,
        column_index(&headers, "G")?,
        column_index(&headers, "B")?,
    ];

    let mut colors = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let [r, g, b] = idx.map(|i| parse_float(record.get(i).unwrap_or(""), row_no, &headers[i]));
        colors.push(Srgb::new(r?, g?, b?));
    }

    log::debug!("loaded {} samples from {}", colors.len(), path.display());
    Ok(ColorSamples::new(colors))
}

// ---------------------------------------------------------------------------
// Point clouds
// ---------------------------------------------------------------------------

/// Load a colored point cloud from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – Float64/Float32 columns `x y z R G B` (recommended)
/// * `.json`    – `[{ "x": .., "y": .., "z": .., "R": .., "G": .., "B": .. }, ...]`
/// * `.csv`     – header with columns `x y z R G B`
/// * `.ply`     – `vertex` element with `x y z red green blue` (Open3D, MeshLab)
///
/// Colors are unit-range floats.
pub fn load_point_cloud(path: &Path) -> Result<PointCloud> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let cloud = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        "ply" => load_ply(path),
        other => bail!("Unsupported point cloud extension: .{other}"),
    }
    .with_context(|| format!("loading point cloud {}", path.display()))?;

    log::info!("loaded {} points from {}", cloud.len(), path.display());
    Ok(cloud)
}

const CLOUD_COLUMNS: [&str; 6] = ["x", "y", "z", "R", "G", "B"];

fn cloud_from_rows(rows: impl IntoIterator<Item = [f64; 6]>) -> Result<PointCloud> {
    let (positions, colors): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .map(|[x, y, z, r, g, b]| ([x, y, z], Srgb::new(r, g, b)))
        .unzip();
    Ok(PointCloud::new(positions, colors)?)
}

// -- JSON --

#[derive(Debug, Deserialize)]
struct PointRecord {
    x: f64,
    y: f64,
    z: f64,
    #[serde(rename = "R")]
    r: f64,
    #[serde(rename = "G")]
    g: f64,
    #[serde(rename = "B")]
    b: f64,
}

fn load_json(path: &Path) -> Result<PointCloud> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let records: Vec<PointRecord> =
        serde_json::from_str(&text).context("Expected a JSON array of point records")?;

    cloud_from_rows(records.into_iter().map(|p| [p.x, p.y, p.z, p.r, p.g, p.b]))
}

// -- CSV --

fn load_csv(path: &Path) -> Result<PointCloud> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut idx = [0usize; 6];
    for (slot, name) in idx.iter_mut().zip(CLOUD_COLUMNS) {
        *slot = column_index(&headers, name)?;
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut row = [0.0; 6];
        for (value, &i) in row.iter_mut().zip(&idx) {
            *value = parse_float(record.get(i).unwrap_or(""), row_no, &headers[i])?;
        }
        rows.push(row);
    }

    cloud_from_rows(rows)
}

// -- Parquet --

/// Works with files written by **Pandas** (`df.to_parquet()`), **Polars**
/// and the `generate_sample` binary.
fn load_parquet(path: &Path) -> Result<PointCloud> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let mut columns = Vec::with_capacity(CLOUD_COLUMNS.len());
        for name in CLOUD_COLUMNS {
            let idx = schema
                .index_of(name)
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
            let values = extract_f64_column(batch.column(idx))
                .with_context(|| format!("reading column '{name}'"))?;
            columns.push(values);
        }

        for row in 0..batch.num_rows() {
            let mut values = [0.0; 6];
            for (value, column) in values.iter_mut().zip(&columns) {
                *value = column[row];
            }
            rows.push(values);
        }
    }

    cloud_from_rows(rows)
}

// -- PLY --

const PLY_POSITION: [&str; 3] = ["x", "y", "z"];
const PLY_COLOR: [&str; 3] = ["red", "green", "blue"];

/// ASCII or binary PLY. Integer colors are scaled by the maximum of their
/// type (`uchar` / 255), float colors are taken as unit range already.
fn load_ply(path: &Path) -> Result<PointCloud> {
    let mut file = std::fs::File::open(path).context("opening PLY file")?;
    let ply = Parser::<DefaultElement>::new()
        .read_ply(&mut file)
        .context("parsing PLY file")?;
    let vertices = ply
        .payload
        .get("vertex")
        .context("PLY file has no 'vertex' element")?;

    let mut rows = Vec::with_capacity(vertices.len());
    for (index, vertex) in vertices.iter().enumerate() {
        let mut row = [0.0; 6];
        for (value, name) in row[..3].iter_mut().zip(PLY_POSITION) {
            *value = ply_property(vertex, name, index, ply_scalar)?;
        }
        for (value, name) in row[3..].iter_mut().zip(PLY_COLOR) {
            *value = ply_property(vertex, name, index, ply_unit)?;
        }
        rows.push(row);
    }

    cloud_from_rows(rows)
}

fn ply_property(
    vertex: &DefaultElement,
    name: &str,
    index: usize,
    convert: fn(&Property) -> Option<f64>,
) -> Result<f64> {
    let prop = vertex
        .get(name)
        .with_context(|| format!("PLY vertex missing '{name}' property"))?;
    convert(prop).with_context(|| format!("vertex {index}: unsupported '{name}' type {prop:?}"))
}

fn ply_scalar(prop: &Property) -> Option<f64> {
    match *prop {
        Property::Char(v) => Some(f64::from(v)),
        Property::UChar(v) => Some(f64::from(v)),
        Property::Short(v) => Some(f64::from(v)),
        Property::UShort(v) => Some(f64::from(v)),
        Property::Int(v) => Some(f64::from(v)),
        Property::UInt(v) => Some(f64::from(v)),
        Property::Float(v) => Some(f64::from(v)),
        Property::Double(v) => Some(v),
        _ => None,
    }
}

fn ply_unit(prop: &Property) -> Option<f64> {
    match *prop {
        Property::UChar(v) => Some(f64::from(v) / 255.0),
        Property::UShort(v) => Some(f64::from(v) / 65535.0),
        Property::Float(_) | Property::Double(_) => ply_scalar(prop),
        _ => None,
    }
}

/// Read a Float64 or Float32 column; nulls become NaN.
fn extract_f64_column(col: &Arc<dyn Array>) -> Result<Vec<f64>> {
    match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            Ok(arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
        }
        other => bail!("Expected Float64 or Float32 column, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn column_index(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("CSV missing '{name}' column"))
}

fn parse_float(s: &str, row: usize, col: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a number"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use approx::assert_relative_eq;
    use arrow::array::ArrayRef;
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use tempfile::TempDir;

    use super::*;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn write_parquet(dir: &TempDir, name: &str, columns: Vec<(&str, ArrayRef)>) -> PathBuf {
        let path = dir.path().join(name);
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        path
    }

    #[test]
    fn chart_values_keep_file_order() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "values.csv",
            "row,col,R,G,B,name\nA,1,115,82,68,dark skin\nd,6,52,52,51,black\n",
        );

        let values = load_chart_values(&path).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values.entries[0].square.to_string(), "A1");
        assert_eq!(values.entries[1].square.to_string(), "D6");
        assert_eq!(values.entries[1].reference, Srgb::new(52, 52, 51));
    }

    #[test]
    fn chart_values_reject_bad_channel() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "values.csv", "row,col,R,G,B\nA,1,300,0,0\n");
        assert!(load_chart_values(&path).is_err());
    }

    #[test]
    fn samples_read_columns_by_name() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "A1.csv", "B,idx,G,R\n0.3,0,0.2,0.1\n0.6,1,0.5,0.4\n");

        let samples = load_samples(&path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_relative_eq!(samples.colors[1].red, 0.4);
        assert_relative_eq!(samples.colors[1].green, 0.5);
        assert_relative_eq!(samples.colors[1].blue, 0.6);
    }

    #[test]
    fn samples_require_rgb_header() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "A1.csv", "R,G\n0.1,0.2\n");
        let err = load_samples(&path).unwrap_err();
        assert!(format!("{err:#}").contains("'B'"));
    }

    #[test]
    fn missing_samples_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_samples(&dir.path().join("nope.csv")).is_err());
    }

    #[test]
    fn point_cloud_from_csv() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "cloud.csv",
            "x,y,z,R,G,B\n0,0,0,1,0,0\n1.5,2.5,0.1,0,1,0\n",
        );

        let cloud = load_point_cloud(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.positions[1], [1.5, 2.5, 0.1]);
        assert_relative_eq!(cloud.colors[1].green, 1.0);
    }

    #[test]
    fn point_cloud_from_json() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "cloud.json",
            r#"[{"x": 1, "y": 2, "z": 3, "R": 0.5, "G": 0.25, "B": 0.0}]"#,
        );

        let cloud = load_point_cloud(&path).unwrap();
        assert_eq!(cloud.positions, vec![[1.0, 2.0, 3.0]]);
        assert_relative_eq!(cloud.colors[0].red, 0.5);
    }

    #[test]
    fn point_cloud_from_parquet_mixed_float_widths() {
        let dir = TempDir::new().unwrap();
        let f64s = |v: Vec<f64>| Arc::new(Float64Array::from(v)) as ArrayRef;
        let f32s = |v: Vec<Option<f32>>| Arc::new(Float32Array::from(v)) as ArrayRef;
        let path = write_parquet(
            &dir,
            "cloud.parquet",
            vec![
                ("x", f64s(vec![0.0, 1.5])),
                ("y", f64s(vec![0.0, 2.5])),
                ("z", f64s(vec![0.0, -0.1])),
                ("R", f32s(vec![Some(1.0), Some(0.5)])),
                ("G", f32s(vec![Some(0.0), Some(0.25)])),
                ("B", f32s(vec![Some(0.0), None])),
            ],
        );

        let cloud = load_point_cloud(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.positions[1], [1.5, 2.5, -0.1]);
        assert_relative_eq!(cloud.colors[1].red, 0.5);
        assert_relative_eq!(cloud.colors[1].green, 0.25);
        assert!(cloud.colors[1].blue.is_nan());
    }

    #[test]
    fn parquet_without_color_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let zeros = || Arc::new(Float64Array::from(vec![0.0])) as ArrayRef;
        let path = write_parquet(
            &dir,
            "cloud.pq",
            vec![
                ("x", zeros()),
                ("y", zeros()),
                ("z", zeros()),
                ("R", zeros()),
                ("G", zeros()),
            ],
        );

        let err = load_point_cloud(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Parquet file missing 'B' column"));
    }

    #[test]
    fn point_cloud_from_ascii_ply() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "cloud.ply",
            "ply\n\
             format ascii 1.0\n\
             comment written by hand\n\
             element vertex 2\n\
             property float x\n\
             property float y\n\
             property float z\n\
             property uchar red\n\
             property uchar green\n\
             property uchar blue\n\
             end_header\n\
             0 0 0 255 0 0\n\
             1.5 2.5 0.25 0 51 255\n",
        );

        let cloud = load_point_cloud(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.positions[1], [1.5, 2.5, 0.25]);
        assert_relative_eq!(cloud.colors[0].red, 1.0);
        assert_relative_eq!(cloud.colors[1].green, 0.2);
        assert_relative_eq!(cloud.colors[1].blue, 1.0);
    }

    #[test]
    fn ply_without_colors_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "cloud.ply",
            "ply\n\
             format ascii 1.0\n\
             element vertex 1\n\
             property double x\n\
             property double y\n\
             property double z\n\
             end_header\n\
             0 0 0\n",
        );

        let err = load_point_cloud(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing 'red' property"));
    }

    #[test]
    fn point_cloud_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "cloud.xyz", "0 0 0\n");
        let err = load_point_cloud(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported point cloud extension"));
    }
}
