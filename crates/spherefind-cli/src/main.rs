//! spherefind CLI — command-line interface for sphere detection in range scans.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use spherefind::{
    CandidateSource, DenseBandSource, DetectConfig, Detector, LoadConfig, RangeGrid,
    RegionSource, StrideScanSource,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "spherefind")]
#[command(about = "Detect spheres of a known diameter in 3D range scans")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect spheres in a scan file.
    Detect(CliDetectArgs),

    /// Print grid dimensions and sample statistics of a scan file.
    Inspect {
        /// Path to the scan (JSON or text log).
        #[arg(long)]
        scan: PathBuf,

        /// Samples above this range (mm) are treated as no return.
        #[arg(long)]
        max_range_mm: Option<u32>,
    },

    /// Print the default detection config as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    /// One density-peak candidate per depth band.
    Dense,
    /// Centers of target-wide connected regions of each depth band.
    Region,
    /// Every `--stride`-th grid cell.
    Stride,
}

#[derive(Debug, Clone, Args)]
struct CliDetectArgs {
    /// Path to the scan (JSON or text log).
    #[arg(long)]
    scan: PathBuf,

    /// Expected sphere diameter in metres.
    #[arg(long)]
    size: f64,

    /// Detection config JSON; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to write detection results (JSON). Printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Linear travel between scan lines (metres).
    #[arg(long)]
    motion_step: Option<f64>,

    /// Angle between samples of one scan line (degrees).
    #[arg(long)]
    angular_step: Option<f64>,

    /// Beam angle of sample 0 (degrees).
    #[arg(long)]
    angle_offset: Option<f64>,

    /// Accepted deviation of the fitness ratio from pi/4.
    #[arg(long)]
    tolerance: Option<f64>,

    /// RANSAC iterations per candidate.
    #[arg(long)]
    iters: Option<usize>,

    /// Base RNG seed; candidate `i` uses `seed + i`.
    #[arg(long)]
    seed: Option<u64>,

    /// Candidate generator.
    #[arg(long, value_enum, default_value_t = SourceArg::Dense)]
    source: SourceArg,

    /// Cell stride for `--source stride`.
    #[arg(long, default_value = "4")]
    stride: u32,
}

impl CliDetectArgs {
    fn to_config(&self) -> CliResult<DetectConfig> {
        let mut config = match &self.config {
            Some(path) => DetectConfig::from_json_file(path)?,
            None => DetectConfig::default(),
        };

        config.target_size_m = self.size;
        if let Some(v) = self.motion_step {
            config.geometry.motion_step_m = v;
        }
        if let Some(v) = self.angular_step {
            config.geometry.angular_step_deg = v;
        }
        if let Some(v) = self.angle_offset {
            config.geometry.angle_offset_deg = v;
        }
        if let Some(v) = self.tolerance {
            config.acceptance.tolerance = v;
        }
        if let Some(v) = self.iters {
            config.sphere.num_iter = v;
        }
        if let Some(v) = self.seed {
            config.sphere.seed = v;
        }

        config.validate()?;
        Ok(config)
    }

    fn to_source(&self, config: &DetectConfig) -> CliResult<Box<dyn CandidateSource>> {
        match self.source {
            SourceArg::Dense => Ok(Box::new(DenseBandSource::new(
                config.density.clone(),
                config.target_size_m,
            ))),
            SourceArg::Region => Ok(Box::new(RegionSource::from_config(config))),
            SourceArg::Stride if self.stride == 0 => Err("--stride must be >= 1".into()),
            SourceArg::Stride => Ok(Box::new(StrideScanSource::new(self.stride))),
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::Inspect { scan, max_range_mm } => run_inspect(&scan, max_range_mm),
        Commands::DefaultConfig => run_default_config(),
    }
}

// ── inspect ────────────────────────────────────────────────────────────

fn run_inspect(scan: &Path, max_range_mm: Option<u32>) -> CliResult<()> {
    let mut load = LoadConfig::default();
    if let Some(v) = max_range_mm {
        load.max_range_mm = v;
    }
    let grid = RangeGrid::from_path(scan, &load)?;
    let (w, h) = grid.dimensions();
    let total = w as usize * h as usize;
    let valid = grid.valid_count();

    let (mut min_mm, mut max_mm, mut sum_mm) = (u32::MAX, 0u32, 0u64);
    for y in 0..h {
        for x in 0..w {
            match grid.get(x, y) {
                Some(mm) if mm != spherefind::NO_RETURN => {
                    min_mm = min_mm.min(mm);
                    max_mm = max_mm.max(mm);
                    sum_mm += mm as u64;
                }
                _ => {}
            }
        }
    }

    println!("spherefind scan {}", scan.display());
    println!("  scan lines:       {}", w);
    println!("  samples per line: {}", h);
    println!(
        "  valid samples:    {} / {} ({:.1}%)",
        valid,
        total,
        100.0 * valid as f64 / total.max(1) as f64
    );
    if valid > 0 {
        println!("  range min:        {} mm", min_mm);
        println!("  range max:        {} mm", max_mm);
        println!("  range mean:       {:.1} mm", sum_mm as f64 / valid as f64);
    }

    Ok(())
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    let json = serde_json::to_string_pretty(&DetectConfig::default())?;
    println!("{}", json);
    Ok(())
}

// ── detect ─────────────────────────────────────────────────────────────

fn run_detect(args: &CliDetectArgs) -> CliResult<()> {
    let config = args.to_config()?;

    tracing::info!("Loading scan: {}", args.scan.display());
    let grid = RangeGrid::from_path(&args.scan, &config.load).map_err(|e| -> CliError {
        format!("Failed to load scan {}: {}", args.scan.display(), e).into()
    })?;
    let (w, h) = grid.dimensions();
    tracing::info!(
        "Grid size: {}x{} ({} valid samples)",
        w,
        h,
        grid.valid_count()
    );

    let mut source = args.to_source(&config)?;
    let detector = Detector::with_config(config)?;
    let result = detector.detect_with_source(&grid, source.as_mut());

    for d in &result.detections {
        tracing::info!("{:.2}: {:?}", d.ratio(), d.window.corners());
    }
    let s = &result.stats;
    tracing::info!(
        "Detected {} spheres ({} candidates, {} skipped, {} rejected, {} duplicates)",
        result.detections.len(),
        s.n_candidates,
        s.n_out_of_range_depth + s.n_out_of_bounds,
        s.n_degenerate + s.n_rejected,
        s.n_duplicates,
    );

    let json = serde_json::to_string_pretty(&result)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
