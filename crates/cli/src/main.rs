//! culexmap CLI - urban heat and mosquito risk rasters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use culexmap_algorithms::density::{KernelShape, OutputValues};
use culexmap_algorithms::heatmap::{HeatmapParams, HeatmapSynthesizer};
use culexmap_algorithms::overlay::{
    evaluate, fill_nodata, mosaic, reclassify_with_report, BandInputs, RangeBoundaries, ReclassTable, Unmatched,
};
use culexmap_core::io::{read_geotiff, write_geotiff_as, SampleType};
use culexmap_core::{Raster, Window};
use culexmap_model::{formulas, tables, write_outputs, FileServices, Model, ModelConfig};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "culexmap")]
#[command(author, version, about = "Urban heat island and mosquito habitat rasters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the study-area window of a reference raster
    Window {
        /// Reference raster (usually the land cover)
        reference: PathBuf,
        /// Grid resolution the window is checked against
        #[arg(short, long, default_value = "10")]
        resolution: f64,
    },
    /// Reclassify a raster by a range table
    Reclassify {
        input: PathBuf,
        output: PathBuf,
        /// Built-in table name or a table file with `low high code` rows
        #[arg(short, long)]
        table: String,
        /// Which range ends are inclusive: upper, lower, both, none
        #[arg(short, long, default_value = "upper")]
        boundaries: RangeBoundaries,
        /// What unmatched cells become: nodata or keep
        #[arg(short, long)]
        unmatched: Option<Unmatched>,
        /// Output no-data value
        #[arg(short, long, default_value = "-9999")]
        nodata: f64,
    },
    /// Evaluate a built-in band formula over up to six aligned rasters
    Calc {
        /// Formula name (see --list)
        #[arg(short, long, required_unless_present = "list")]
        formula: Option<String>,
        /// List the available formulas and exit
        #[arg(long)]
        list: bool,
        #[arg(short = 'a', long)]
        band_a: Option<PathBuf>,
        #[arg(short = 'b', long)]
        band_b: Option<PathBuf>,
        #[arg(short = 'c', long)]
        band_c: Option<PathBuf>,
        #[arg(short = 'd', long)]
        band_d: Option<PathBuf>,
        #[arg(short = 'e', long)]
        band_e: Option<PathBuf>,
        #[arg(short = 'g', long)]
        band_f: Option<PathBuf>,
        #[arg(short, long, required_unless_present = "list")]
        output: Option<PathBuf>,
        #[arg(short, long, default_value = "-9999")]
        nodata: f64,
    },
    /// Merge aligned rasters by cell-wise maximum
    Mosaic {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Input rasters
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },
    /// Replace no-data cells with a constant
    Fill {
        input: PathBuf,
        output: PathBuf,
        #[arg(short = 'x', long, default_value = "0")]
        value: f64,
    },
    /// Build the six-band hotspot heatmap of a class raster
    Heatmap {
        input: PathBuf,
        output: PathBuf,
        /// Kernel radius in map units
        #[arg(short, long, default_value = "400")]
        radius: f64,
        /// Density pixel size in map units
        #[arg(short, long, default_value = "10")]
        pixel_size: f64,
        /// Kernel: quartic, triangular, uniform, triweight, epanechnikov
        #[arg(short, long, default_value = "triweight")]
        kernel: KernelShape,
        /// Kernel output: raw or scaled
        #[arg(long, default_value = "raw")]
        values: OutputValues,
        /// Keep the band surfaces in this directory
        #[arg(short, long)]
        scratch: Option<PathBuf>,
        /// Reuse band surfaces already stored in the scratch directory
        #[arg(long, requires = "scratch")]
        reuse: bool,
    },
    /// Run the full model from a TOML configuration
    Run {
        /// Model configuration
        config: PathBuf,
        /// Override the configured output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only print the stage plan
        #[arg(long)]
        dry_run: bool,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> =
        read_geotiff(path).with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &Path, sample: SampleType) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff_as(raster, path, sample).with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn integer_codes(table: &ReclassTable) -> bool {
    table.entries.iter().all(|e| e.code.fract() == 0.0)
}

/// Built-in table by name, else a table file
fn load_table(arg: &str) -> Result<ReclassTable> {
    if let Some(table) = tables::by_name(arg) {
        return Ok(table);
    }
    let path = Path::new(arg);
    if !path.exists() {
        anyhow::bail!(
            "Unknown table: {}. Use a file or one of: {}",
            arg,
            tables::NAMES.join(", ")
        );
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read table {}", arg))?;
    ReclassTable::parse(&text).with_context(|| format!("Invalid table {}", arg))
}

// ─── Commands ───────────────────────────────────────────────────────────

/// Machine-readable form of `info`
fn raster_summary(raster: &Raster<f64>, input: &Path) -> serde_json::Value {
    let (rows, cols) = raster.shape();
    let (min_x, min_y, max_x, max_y) = raster.bounds();
    json!({
        "file": input.display().to_string(),
        "rows": rows,
        "cols": cols,
        "cell_size": raster.cell_size(),
        "bounds": { "min_x": min_x, "min_y": min_y, "max_x": max_x, "max_y": max_y },
        "crs": raster.crs(),
        "nodata": raster.nodata(),
        "statistics": raster.statistics(),
    })
}

fn info_command(input: &Path, as_json: bool) -> Result<()> {
    let raster = read_raster(input)?;
    if as_json {
        let summary = raster_summary(&raster, input);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {}", raster.cell_size());
    println!(
        "Bounds: ({:.3}, {:.3}) - ({:.3}, {:.3})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    if let Some(crs) = raster.crs() {
        println!("CRS: {}", crs);
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    println!("  Valid cells: {}", stats.valid_count);
    println!("  NoData cells: {}", stats.nodata_count);
    Ok(())
}

fn window_command(reference: &Path, resolution: f64) -> Result<()> {
    let raster = read_raster(reference)?;
    let window = Window::from_reference(&raster).context("Reference raster has no usable extent")?;
    let (rows, cols) = window.grid_shape(resolution)?;
    println!("Window: {}", window);
    println!("projwin: {}", window.projwin());
    println!("Grid at {}: {} x {}", resolution, cols, rows);
    match window.ensure_aligned(&raster, resolution) {
        Ok(()) => println!("Reference is on the window grid"),
        Err(e) => println!("Reference is not on the window grid: {}", e),
    }
    Ok(())
}

fn calc_command(formula: &str, bands: [Option<PathBuf>; 6], output: &Path, nodata: f64) -> Result<()> {
    let formula = formulas::by_name(formula).with_context(|| {
        let names: Vec<&str> = formulas::ALL.iter().map(|f| f.name).collect();
        format!("Unknown formula: {}. Use one of: {}", formula, names.join(", "))
    })?;
    let paths: Vec<PathBuf> = bands.into_iter().flatten().collect();
    if paths.len() < formula.arity {
        anyhow::bail!("Formula {} needs {} bands, got {}", formula.name, formula.arity, paths.len());
    }
    let rasters = paths.iter().map(|p| read_raster(p)).collect::<Result<Vec<_>>>()?;
    let refs: Vec<&Raster<f64>> = rasters.iter().collect();

    let start = Instant::now();
    let inputs = BandInputs::from_slice(&refs)?;
    let result = evaluate(&formula, &inputs, nodata).context("Band formula failed")?;
    let elapsed = start.elapsed();
    write_result(&result, output, SampleType::Float32)?;
    done(formula.name, output, elapsed);
    Ok(())
}

fn run_command(config: &Path, output: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let mut config = ModelConfig::from_file(config)
        .with_context(|| format!("Failed to load configuration {}", config.display()))?;
    if let Some(dir) = output {
        config.output.dir = dir;
    }
    let out_dir = config.output.dir.clone();
    let services = FileServices::new(config.inputs.clone(), &config.settings);
    let model = Model::new(config, services);

    if dry_run {
        let (landcover, window) = model.reference()?;
        let seeds = model.seeds(landcover, &window)?;
        let graph = model.graph(&window, seeds.contains_key("ocean_distance"), None)?;
        let plan = graph.plan(seeds.keys().map(String::as_str))?;
        println!("Window: {}", window.projwin());
        for (i, wave) in plan.iter().enumerate() {
            println!("  wave {:>2}: {}", i, wave.join(", "));
        }
        return Ok(());
    }

    let start = Instant::now();
    let pb = spinner("Running model...");
    let outputs = model.run();
    pb.finish_and_clear();
    let outputs = outputs.context("Model run failed")?;

    let manifest = write_outputs(&outputs, &out_dir).context("Failed to write outputs")?;
    for artifact in &manifest.artifacts {
        println!("{} saved to: {}", artifact.name, artifact.path.display());
    }
    println!("  Stages: {}", manifest.stages.len());
    println!("  Processing time: {:.2?}", start.elapsed());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input, json } => info_command(&input, json)?,

        Commands::Window { reference, resolution } => window_command(&reference, resolution)?,

        Commands::Reclassify {
            input,
            output,
            table,
            boundaries,
            unmatched,
            nodata,
        } => {
            let mut rt = load_table(&table)?.with_boundaries(boundaries);
            if let Some(unmatched) = unmatched {
                rt = rt.with_unmatched(unmatched);
            }
            let raster = read_raster(&input)?;
            let start = Instant::now();
            let (result, report) = reclassify_with_report(&raster, &rt, nodata).context("Reclassification failed")?;
            let elapsed = start.elapsed();
            info!(
                matched = report.matched,
                gaps = report.gaps,
                nodata_in = report.nodata_in,
                "reclassified"
            );
            // Int32 unless a code is fractional or unmatched cells keep their input value
            let sample = if rt.unmatched == Unmatched::KeepOriginal || !integer_codes(&rt) {
                SampleType::Float32
            } else {
                SampleType::Int32
            };
            write_result(&result, &output, sample)?;
            done("Reclassified raster", &output, elapsed);
        }

        Commands::Calc {
            formula,
            list,
            band_a,
            band_b,
            band_c,
            band_d,
            band_e,
            band_f,
            output,
            nodata,
        } => {
            if list {
                for f in formulas::ALL.iter() {
                    println!("{:<24} {} bands", f.name, f.arity);
                }
                return Ok(());
            }
            let formula = formula.context("--formula is required")?;
            let output = output.context("--output is required")?;
            calc_command(&formula, [band_a, band_b, band_c, band_d, band_e, band_f], &output, nodata)?;
        }

        Commands::Mosaic { output, inputs } => {
            let rasters = inputs.iter().map(|p| read_raster(p)).collect::<Result<Vec<_>>>()?;
            let refs: Vec<&Raster<f64>> = rasters.iter().collect();
            let start = Instant::now();
            let result = mosaic(&refs).context("Mosaic failed")?;
            let elapsed = start.elapsed();
            write_result(&result, &output, SampleType::Float32)?;
            done("Mosaic", &output, elapsed);
        }

        Commands::Fill { input, output, value } => {
            let raster = read_raster(&input)?;
            let start = Instant::now();
            let result = fill_nodata(&raster, value)?;
            let elapsed = start.elapsed();
            write_result(&result, &output, SampleType::Float32)?;
            done("Filled raster", &output, elapsed);
        }

        Commands::Heatmap {
            input,
            output,
            radius,
            pixel_size,
            kernel,
            values,
            scratch,
            reuse,
        } => {
            let raster = read_raster(&input)?;
            let window = Window::from_reference(&raster)?;
            let mut params = HeatmapParams {
                resolution: raster.cell_size(),
                ..HeatmapParams::default()
            };
            params.kde.radius = radius;
            params.kde.pixel_size = pixel_size;
            params.kde.kernel = kernel;
            params.kde.output = values;

            let mut synthesizer = HeatmapSynthesizer::new(params, window);
            if let Some(dir) = scratch {
                synthesizer = synthesizer.with_scratch(dir, reuse);
            }

            let start = Instant::now();
            let pb = spinner("Building heatmap bands...");
            let result = synthesizer.synthesize(&raster);
            pb.finish_and_clear();
            let result = result.context("Heatmap synthesis failed")?;
            let elapsed = start.elapsed();
            write_result(&result, &output, SampleType::Float32)?;
            done("Heatmap", &output, elapsed);
        }

        Commands::Run { config, output, dry_run } => run_command(&config, output, dry_run)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use culexmap_core::{GeoTransform, CRS};

    #[test]
    fn info_summary_as_json() {
        let mut raster = Raster::from_vec(vec![1.0, 3.0, -9999.0, 5.0], 2, 2).unwrap();
        raster.set_transform(GeoTransform::new(647_000.0, 6_640_020.0, 10.0, -10.0));
        raster.set_nodata(Some(-9999.0));
        raster.set_crs(Some(CRS::from_epsg(3006)));

        let summary = raster_summary(&raster, Path::new("lc.tif"));
        assert_eq!(summary["file"], "lc.tif");
        assert_eq!(summary["rows"], 2);
        assert_eq!(summary["cell_size"], 10.0);
        assert_eq!(summary["bounds"]["min_x"], 647_000.0);
        assert_eq!(summary["bounds"]["max_y"], 6_640_020.0);
        assert_eq!(summary["nodata"], -9999.0);
        assert!(!summary["crs"].is_null());
        assert_eq!(summary["statistics"]["valid_count"], 3);
        assert_eq!(summary["statistics"]["max"], 5.0);
    }

    #[test]
    fn class_tables_have_integer_codes() {
        assert!(integer_codes(&load_table("land_cover").unwrap()));
        assert!(!integer_codes(&ReclassTable::new([(0.0, 1.0, 0.5)])));
    }

    #[test]
    fn info_flag_parses() {
        let cli = Cli::try_parse_from(["culexmap", "info", "lc.tif", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Info { json: true, .. }));
    }
}
