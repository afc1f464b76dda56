//! Write a synthetic colorchart dataset for trying out `colorchart`.
//!
//! Layout under the output directory:
//! ```text
//! color_checker/color_checker_ref.png     template, one solid color per square
//! color_checker/color_checker_values.csv  row,col,R,G,B
//! test_data/<square>.csv                  noisy measurements, D6 left out
//! test_data/pointcloud_b.ply              the chart as a colored point cloud
//! test_data/pointcloud_b.parquet          the same cloud as a table
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use palette::Srgb;
use parquet::arrow::ArrowWriter;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;

use colorchart::chart::ChartCanvas;
use colorchart::color::generate_palette;
use colorchart::data::export::write_samples;
use colorchart::data::model::{ColorSamples, SquareId};
use colorchart::fill::INFERRED_SQUARE;

const ROWS: [char; 4] = ['A', 'B', 'C', 'D'];
const COLS: u32 = 6;
/// Neutral row, brightest to darkest.
const GRAYS: [u8; 6] = [243, 200, 160, 122, 85, 52];

const SQUARE_PX: u32 = 60;
const GAP_PX: u32 = 10;
const BACKGROUND: Srgb<u8> = Srgb::new(0, 0, 0);

/// Edge length of a square in the point cloud, in cloud units.
const SQUARE_SIZE: f64 = 0.9;
const POINTS_PER_SQUARE: usize = 300;

#[derive(Parser, Debug)]
#[command(about = "Generate a synthetic colorchart dataset")]
struct Cli {
    /// Output directory
    #[arg(default_value = ".")]
    out_dir: PathBuf,
    /// Seed for the measurement noise
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Square {
    id: SquareId,
    reference: Srgb<u8>,
}

fn chart_squares() -> Result<Vec<Square>> {
    let hues = generate_palette(3 * COLS as usize);
    let mut squares = Vec::new();
    for (r, &row) in ROWS.iter().enumerate() {
        for c in 0..COLS {
            let reference = if row == 'D' {
                let v = GRAYS[c as usize];
                Srgb::new(v, v, v)
            } else {
                hues[r * COLS as usize + c as usize]
            };
            squares.push(Square {
                id: SquareId::new(row, c + 1)?,
                reference,
            });
        }
    }
    Ok(squares)
}

/// The scanned color of a patch: a little darker than the reference plus noise.
fn scanned_color(reference: Srgb<u8>, rng: &mut SimpleRng) -> Srgb<f64> {
    let channel = |v: u8, rng: &mut SimpleRng| {
        (f64::from(v) / 255.0 * 0.85 + rng.gauss(0.0, 0.02)).clamp(0.0, 1.0)
    };
    let r = channel(reference.red, rng);
    let g = channel(reference.green, rng);
    let b = channel(reference.blue, rng);
    Srgb::new(r, g, b)
}

fn write_template(path: &Path, squares: &[Square]) -> Result<()> {
    let width = GAP_PX + COLS * (SQUARE_PX + GAP_PX);
    let height = GAP_PX + ROWS.len() as u32 * (SQUARE_PX + GAP_PX);
    let mut canvas = ChartCanvas::filled(width, height, BACKGROUND);

    for sq in squares {
        let row = ROWS.iter().position(|&r| r == sq.id.row).unwrap_or(0) as u32;
        let x = GAP_PX + (sq.id.col - 1) * (SQUARE_PX + GAP_PX);
        let y = GAP_PX + row * (SQUARE_PX + GAP_PX);
        canvas.fill_rect(x, y, SQUARE_PX, SQUARE_PX, sq.reference);
    }
    canvas.save(path)
}

fn write_values(path: &Path, squares: &[Square]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating values CSV")?;
    writer.write_record(["row", "col", "R", "G", "B"])?;
    for sq in squares {
        writer.write_record([
            sq.id.row.to_string(),
            sq.id.col.to_string(),
            sq.reference.red.to_string(),
            sq.reference.green.to_string(),
            sq.reference.blue.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Columns x, y, z, R, G, B of the point cloud.
#[derive(Default)]
struct CloudColumns {
    cols: [Vec<f64>; 6],
}

impl CloudColumns {
    fn push(&mut self, p: [f64; 3], c: Srgb<f64>) {
        for (col, v) in self.cols.iter_mut().zip([p[0], p[1], p[2], c.red, c.green, c.blue]) {
            col.push(v);
        }
    }

    fn len(&self) -> usize {
        self.cols[0].len()
    }

    /// ASCII PLY with double positions and 8-bit colors, as Open3D exports.
    fn write_ply(&self, path: &Path) -> Result<()> {
        let positions = ["x", "y", "z"];
        let colors = ["red", "green", "blue"];

        let mut vertex = ElementDef::new("vertex".to_string());
        for name in positions {
            let ty = PropertyType::Scalar(ScalarType::Double);
            vertex.properties.add(PropertyDef::new(name.to_string(), ty));
        }
        for name in colors {
            let ty = PropertyType::Scalar(ScalarType::UChar);
            vertex.properties.add(PropertyDef::new(name.to_string(), ty));
        }

        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = Encoding::Ascii;
        ply.header.elements.add(vertex);

        let points = (0..self.len())
            .map(|i| {
                let mut point = DefaultElement::new();
                for (name, col) in positions.iter().zip(&self.cols[..3]) {
                    point.insert(name.to_string(), Property::Double(col[i]));
                }
                for (name, col) in colors.iter().zip(&self.cols[3..]) {
                    let v = (col[i] * 255.0).round().clamp(0.0, 255.0) as u8;
                    point.insert(name.to_string(), Property::UChar(v));
                }
                point
            })
            .collect();
        ply.payload.insert("vertex".to_string(), points);

        let file = File::create(path).context("Failed to create PLY file")?;
        let mut out = BufWriter::new(file);
        Writer::new()
            .write_ply(&mut out, &mut ply)
            .context("Failed to write PLY")?;
        out.flush().context("Failed to flush PLY")?;
        Ok(())
    }

    fn write_parquet(self, path: &Path) -> Result<()> {
        let names = ["x", "y", "z", "R", "G", "B"];
        let schema = Arc::new(Schema::new(
            names
                .iter()
                .map(|n| Field::new(*n, DataType::Float64, false))
                .collect::<Vec<_>>(),
        ));
        let arrays: Vec<ArrayRef> = self
            .cols
            .into_iter()
            .map(|c| Arc::new(Float64Array::from(c)) as ArrayRef)
            .collect();
        let batch = RecordBatch::try_new(schema.clone(), arrays)
            .context("Failed to create RecordBatch")?;

        let file = File::create(path).context("Failed to create output file")?;
        let mut writer =
            ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
        writer.write(&batch).context("Failed to write batch")?;
        writer.close().context("Failed to close writer")?;
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut rng = SimpleRng::new(cli.seed);

    let chart_dir = cli.out_dir.join("color_checker");
    let data_dir = cli.out_dir.join("test_data");
    std::fs::create_dir_all(&chart_dir).context("creating color_checker directory")?;
    std::fs::create_dir_all(&data_dir).context("creating test_data directory")?;

    let squares = chart_squares()?;
    write_template(&chart_dir.join("color_checker_ref.png"), &squares)?;
    write_values(&chart_dir.join("color_checker_values.csv"), &squares)?;

    let mut cloud = CloudColumns::default();
    for sq in &squares {
        let row = ROWS.iter().position(|&r| r == sq.id.row).unwrap_or(0) as f64;
        let x0 = f64::from(sq.id.col - 1);
        // Row A at the top, like the printed chart.
        let y0 = (ROWS.len() as f64 - 1.0) - row;

        // The first four points are the square's corners.
        let first = cloud.len();
        let mut colors = Vec::with_capacity(POINTS_PER_SQUARE);
        for i in 0..POINTS_PER_SQUARE {
            let (dx, dy) = match i {
                0 => (0.0, 0.0),
                1 => (SQUARE_SIZE, 0.0),
                2 => (SQUARE_SIZE, SQUARE_SIZE),
                3 => (0.0, SQUARE_SIZE),
                _ => (rng.next_f64() * SQUARE_SIZE, rng.next_f64() * SQUARE_SIZE),
            };
            let color = scanned_color(sq.reference, &mut rng);
            cloud.push([x0 + dx, y0 + dy, rng.gauss(0.0, 0.002)], color);
            colors.push(color);
        }

        if sq.id == INFERRED_SQUARE {
            println!("{}: no measurement written (will be inferred)", sq.id);
        } else {
            let path = data_dir.join(sq.id.file_name());
            write_samples(&path, &ColorSamples::new(colors))?;
        }
        println!(
            "{}: corners are points {},{},{},{}",
            sq.id,
            first,
            first + 1,
            first + 2,
            first + 3
        );
    }

    let n_points = cloud.len();
    cloud.write_ply(&data_dir.join("pointcloud_b.ply"))?;
    cloud.write_parquet(&data_dir.join("pointcloud_b.parquet"))?;

    println!(
        "Wrote {} squares and {n_points} points to {}",
        squares.len(),
        cli.out_dir.display()
    );
    Ok(())
}
