use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use colorchart::color::hex;
use colorchart::config::{self, FillConfig, PickConfig};
use colorchart::fill::ColorSource;
use colorchart::{fill, pick};

#[derive(Parser, Debug)]
#[command(name = "colorchart")]
#[command(about = "Fill colorchart templates with colors sampled from point clouds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Paint the reference chart with measured (or inferred) square colors
    Fill(FillArgs),
    /// Export the colors of one square picked on a point cloud
    Pick(PickArgs),
}

#[derive(Args, Debug)]
struct FillArgs {
    /// JSON config; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,
    /// Reference template image
    #[arg(long)]
    template: Option<PathBuf>,
    /// Master values CSV (row,col,R,G,B)
    #[arg(long)]
    values: Option<PathBuf>,
    /// Directory with <square>.csv measurements
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Output image
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PickArgs {
    /// Point cloud (.ply, .parquet, .json or .csv)
    cloud: Option<PathBuf>,
    /// Indices of the four picked corner points
    #[arg(long, short, value_delimiter = ',', required = true)]
    points: Vec<usize>,
    /// Square name used for the output file, e.g. A1
    #[arg(long, short)]
    name: Option<String>,
    /// Directory for the exported CSV
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// JSON config; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Fill(args) => run_fill(args),
        Commands::Pick(args) => run_pick(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_fill(args: FillArgs) -> anyhow::Result<()> {
    let mut cfg: FillConfig = match &args.config {
        Some(path) => config::from_json_file(path)?,
        None => FillConfig::default(),
    };
    if let Some(v) = args.template {
        cfg.template = v;
    }
    if let Some(v) = args.values {
        cfg.values = v;
    }
    if let Some(v) = args.data_dir {
        cfg.data_dir = v;
    }
    if let Some(v) = args.output {
        cfg.output = v;
    }

    let report = fill::run(&cfg)?;

    for r in &report.recolored {
        let how = match r.source {
            ColorSource::Measured { samples } => format!("mean of {samples} points"),
            ColorSource::Inferred => "inferred".to_string(),
        };
        println!("{}  {}  {how}  ({} px)", r.square, hex(r.color), r.pixels);
    }
    for square in &report.skipped {
        println!("{square}  skipped (no data)");
    }
    println!("Saved {}", cfg.output.display());
    Ok(())
}

fn run_pick(args: PickArgs) -> anyhow::Result<()> {
    let mut cfg: PickConfig = match &args.config {
        Some(path) => config::from_json_file(path)?,
        None => PickConfig::default(),
    };
    if let Some(v) = args.cloud {
        cfg.cloud = v;
    }
    if let Some(v) = args.name {
        cfg.name = v;
    }
    if let Some(v) = args.out_dir {
        cfg.out_dir = v;
    }

    let (path, selection) = pick::run(&cfg, &args.points)?;
    println!(
        "Saved {} RGB values to {}",
        selection.indices.len(),
        path.display()
    );
    Ok(())
}
