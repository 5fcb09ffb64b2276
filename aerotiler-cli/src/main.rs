//! Aerotiler CLI - chart tile pyramid builder
//!
//! Drives the library end to end: load the catalog, reproject every chart
//! referenced by the selected tilesets, then mosaic them into XYZ tile
//! trees. Either half can be skipped: omit `--zippath` (or pass
//! `--tile-only`) to reuse existing processed rasters, omit `--outpath`
//! to stop after processing.

mod error;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::info;

use aerotiler::catalog::Catalog;
use aerotiler::pipeline::{self, PipelineOptions};
use aerotiler::resample::Resampling;
use aerotiler::tile::{TileEngine, TileEngineOptions, TileFormat};
use error::CliError;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Png,
    Jpeg,
    Webp,
}

impl From<FormatArg> for TileFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => TileFormat::Png,
            FormatArg::Jpeg => TileFormat::Jpeg,
            FormatArg::Webp => TileFormat::Webp,
        }
    }
}

#[derive(Parser)]
#[command(name = "aerotiler")]
#[command(version = aerotiler::VERSION)]
#[command(about = "Convert aeronautical charts to web map tiles", long_about = None)]
struct Cli {
    /// Catalog file
    #[arg(short, long, default_value = "aerotiler.conf.json")]
    config: PathBuf,

    /// Directory containing source ZIP archives
    #[arg(short, long)]
    zippath: Option<PathBuf>,

    /// Directory for processed rasters and zoom VRTs
    #[arg(short, long, default_value = "/tmp/aerotiler")]
    tmppath: PathBuf,

    /// Tile output directory (omit to skip tile generation)
    #[arg(short, long)]
    outpath: Option<PathBuf>,

    /// Comma-separated tileset names (default: all)
    #[arg(short = 's', long, value_delimiter = ',')]
    tilesets: Vec<String>,

    /// Tile format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Png)]
    format: FormatArg,

    /// Concurrent dataset jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Tile generation workers (0 = auto)
    #[arg(short = 'w', long, default_value_t = 0)]
    tile_workers: usize,

    /// Target EPSG code
    #[arg(short, long, default_value_t = 3857)]
    epsg: u32,

    /// Resampling kernel for reprojection
    #[arg(long, default_value = "bilinear")]
    reproject_resampling: String,

    /// Resampling kernel for tile generation
    #[arg(long, default_value = "bilinear")]
    tile_resampling: String,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Remove the temp directory after processing
    #[arg(short = 'C', long)]
    cleanup: bool,

    /// Skip processing, reuse existing processed rasters
    #[arg(short = 'T', long)]
    tile_only: bool,

    /// List available tilesets and exit
    #[arg(short, long)]
    list: bool,
}

fn main() {
    let cli = Cli::parse();
    aerotiler::logging::init(cli.quiet);

    if let Err(err) = run(cli) {
        err.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let catalog = Catalog::from_path(&cli.config)?;

    if cli.list {
        list_tilesets(&catalog);
        return Ok(());
    }

    let cpus = num_cpus();
    let (jobs, threads_per_job, tile_workers) =
        worker_counts(cpus, cli.jobs, cli.tile_workers);

    info!("aerotiler v{} - chart tile generator", aerotiler::VERSION);
    info!(
        "  zippath: {}",
        cli.zippath
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - datasets will not be processed)".to_string())
    );
    info!(
        "  outpath: {}",
        cli.outpath
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - tiles will not be generated)".to_string())
    );
    info!("  tmppath: {}", cli.tmppath.display());
    info!(
        "  CPUs: {}, jobs: {}, threads/job: {}, tile workers: {}",
        cpus, jobs, threads_per_job, tile_workers
    );

    if let Some(outpath) = &cli.outpath {
        std::fs::create_dir_all(outpath).map_err(|error| CliError::DirCreate {
            path: outpath.display().to_string(),
            error,
        })?;
    }
    std::fs::create_dir_all(&cli.tmppath).map_err(|error| CliError::DirCreate {
        path: cli.tmppath.display().to_string(),
        error,
    })?;

    // Resolve requested tilesets; unknown names are reported but do not
    // abort the rest of the run.
    let requested: Vec<String> = if cli.tilesets.is_empty() {
        catalog.tileset_names().iter().map(|s| s.to_string()).collect()
    } else {
        cli.tilesets.clone()
    };

    let mut selected = Vec::new();
    for name in &requested {
        match catalog.tileset(name) {
            Some(tileset) => selected.push(tileset),
            None => eprintln!("Error: unknown tileset: {}", name),
        }
    }
    if selected.is_empty() {
        return Err(CliError::NoTilesets);
    }

    info!("processing {} tileset(s)", selected.len());

    if let Some(zippath) = &cli.zippath {
        if !cli.tile_only {
            let options = PipelineOptions {
                zippath: zippath.clone(),
                tmppath: cli.tmppath.clone(),
                epsg: cli.epsg,
                resampling: Resampling::from_name(&cli.reproject_resampling),
                workers: jobs,
                threads_per_job,
            };
            let outcome = pipeline::process_datasets(&catalog, &selected, &options);
            if !outcome.all_succeeded() {
                eprintln!("Error: dataset processing had failures");
            }
        }
    }

    let mut failed_tilesets = 0;
    if let Some(outpath) = &cli.outpath {
        let engine_options = TileEngineOptions {
            tmppath: cli.tmppath.clone(),
            outpath: outpath.clone(),
            format: cli.format.into(),
            resampling: Resampling::from_name(&cli.tile_resampling),
            workers: tile_workers,
        };

        for tileset in &selected {
            let engine = TileEngine::new(&catalog, tileset, engine_options.clone());
            match engine.generate() {
                Ok(report) => {
                    info!(
                        "  {} complete: base {}+{} existing, overview {}+{} existing",
                        tileset.name,
                        report.base.generated,
                        report.base.existing,
                        report.overview.generated,
                        report.overview.existing
                    );
                }
                Err(err) => {
                    eprintln!("Error: tileset '{}' failed: {}", tileset.name, err);
                    failed_tilesets += 1;
                }
            }
        }
    }

    if cli.cleanup {
        info!("cleaning up temp directory: {}", cli.tmppath.display());
        if let Err(err) = std::fs::remove_dir_all(&cli.tmppath) {
            if err.kind() != std::io::ErrorKind::NotFound {
                eprintln!(
                    "Error: failed to remove temp directory '{}': {}",
                    cli.tmppath.display(),
                    err
                );
            }
        }
    }

    if failed_tilesets > 0 {
        return Err(CliError::TilesetFailures(failed_tilesets));
    }
    info!("done");
    Ok(())
}

fn list_tilesets(catalog: &Catalog) {
    println!("Available tilesets:");
    for name in catalog.tileset_names() {
        if let Some(tileset) = catalog.tileset(name) {
            println!(
                "  {:<40} ({}, zoom {}-{})",
                tileset.name, tileset.tile_path, tileset.zoom_min, tileset.zoom_max
            );
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Derives worker counts from the CPU count and explicit overrides.
/// Dataset jobs default to at most 4 (each job warps with its own thread
/// pool); tile workers default to one per CPU.
fn worker_counts(cpus: usize, jobs_arg: usize, tile_workers_arg: usize) -> (usize, usize, usize) {
    let jobs = if jobs_arg == 0 {
        cpus.min(4)
    } else {
        jobs_arg
    };
    let threads_per_job = (cpus / jobs).max(1);
    let tile_workers = if tile_workers_arg == 0 {
        cpus
    } else {
        tile_workers_arg
    };
    (jobs, threads_per_job, tile_workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_defaults() {
        // 16 CPUs: 4 dataset jobs x 4 warp threads, 16 tile workers.
        assert_eq!(worker_counts(16, 0, 0), (4, 4, 16));
        // 2 CPUs: jobs capped at the CPU count.
        assert_eq!(worker_counts(2, 0, 0), (2, 1, 2));
        // Single core still gets one of everything.
        assert_eq!(worker_counts(1, 0, 0), (1, 1, 1));
    }

    #[test]
    fn test_worker_count_overrides() {
        assert_eq!(worker_counts(16, 8, 0), (8, 2, 16));
        assert_eq!(worker_counts(16, 0, 32), (4, 4, 32));
        // Oversubscribed jobs still give each at least one warp thread.
        assert_eq!(worker_counts(4, 8, 0), (8, 1, 4));
    }

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::try_parse_from(["aerotiler"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("aerotiler.conf.json"));
        assert_eq!(cli.tmppath, PathBuf::from("/tmp/aerotiler"));
        assert_eq!(cli.epsg, 3857);
        assert!(!cli.quiet);
        assert!(cli.tilesets.is_empty());
    }

    #[test]
    fn test_cli_parses_tileset_list() {
        let cli = Cli::try_parse_from(["aerotiler", "-s", "sec,tac", "-f", "webp"]).unwrap();
        assert_eq!(cli.tilesets, vec!["sec", "tac"]);
        assert!(matches!(cli.format, FormatArg::Webp));
    }
}
