//! Dataset processing pipeline
//!
//! Transforms one chart from its ZIP archive into a reprojected,
//! overview-built GeoTIFF. Stages run strictly in sequence within a
//! dataset; parallelism is across datasets via the job queue. Stage
//! details live in [`stages`]; this module wires them together and runs
//! the parallel driver.

mod error;
pub mod stages;

pub use error::PipelineError;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use gdal::{Dataset, DriverManager};
use tracing::{error, info};

use crate::catalog::{self, Catalog, Tileset};
use crate::jobqueue::{JobQueue, QueueOutcome};
use crate::resample::Resampling;

/// Settings shared by every dataset job in a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory containing the source ZIP archives.
    pub zippath: PathBuf,
    /// Directory receiving processed rasters.
    pub tmppath: PathBuf,
    /// Target projection EPSG code.
    pub epsg: u32,
    /// Reprojection kernel.
    pub resampling: Resampling,
    /// Concurrent dataset jobs.
    pub workers: usize,
    /// Warp threads within each job.
    pub threads_per_job: usize,
}

/// Virtual-filesystem path for a dataset's raster inside its archive.
pub fn vsi_zip_path(zippath: &Path, dataset: &catalog::Dataset) -> String {
    format!(
        "/vsizip/{}/{}.zip/{}",
        zippath.display(),
        dataset.zip_file,
        dataset.input_file
    )
}

/// Runs the full stage sequence for one dataset, writing
/// `{tmppath}/{tmp_file}`.
pub fn process_dataset(
    dataset: &catalog::Dataset,
    options: &PipelineOptions,
) -> Result<(), PipelineError> {
    let out_path = options.tmppath.join(&dataset.tmp_file);
    let result = run_stages(dataset, options, &out_path);
    if result.is_err() {
        // Never leave a partial raster behind; downstream stages treat an
        // unreadable file the same as a missing one.
        let _ = std::fs::remove_file(&out_path);
    }
    result
}

fn run_stages(
    dataset: &catalog::Dataset,
    options: &PipelineOptions,
    out_path: &Path,
) -> Result<(), PipelineError> {
    let name = dataset.name.as_str();
    let vsi_path = vsi_zip_path(&options.zippath, dataset);

    info!("  {} opening {}", name, vsi_path);
    let src =
        Dataset::open(Path::new(&vsi_path)).map_err(|_| PipelineError::SourceNotFound(vsi_path))?;
    let (width, height) = src.raster_size();
    info!(
        "    {} opened: {}x{}, {} bands",
        name,
        width,
        height,
        src.raster_count()
    );

    let (src, window_offset) = stages::expand_palette(src, dataset.mask.as_ref(), name)?;

    let (src, cumulative_offset) = match &dataset.mask {
        Some(mask) => {
            info!("  {} applying pixel mask ({} rings)", name, mask.rings.len());
            stages::apply_mask(src, mask, window_offset, name)?
        }
        None => (src, window_offset),
    };

    let src = if dataset.gcps.is_empty() {
        src
    } else {
        info!("  {} applying {} GCPs", name, dataset.gcps.len());
        stages::apply_gcps(src, &dataset.gcps, cumulative_offset, name)?
    };

    info!("  {} warping to EPSG:{}", name, options.epsg);
    let src = stages::warp_to_target(
        &src,
        dataset.max_lod,
        options.epsg,
        options.resampling,
        options.threads_per_job,
        name,
    )?;

    let src = match &dataset.geobound {
        Some(bounds) => {
            info!("  {} clipping to geographic bounds", name);
            stages::clip_to_bounds(src, bounds, options.epsg, name)?
        }
        None => src,
    };

    info!("  {} saving to {}", name, out_path.display());
    stages::save_with_overviews(&src, out_path)?;
    info!("    {} saved", name);

    Ok(())
}

/// The distinct datasets referenced by the given tilesets, ordered by work
/// estimate descending so large charts start first and don't straggle the
/// pool.
pub fn ordered_jobs<'a>(
    catalog: &'a Catalog,
    tilesets: &[&Tileset],
) -> Vec<&'a catalog::Dataset> {
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for tileset in tilesets {
        for dataset in catalog.tileset_datasets(tileset) {
            if seen.insert(dataset.name.as_str()) {
                jobs.push(dataset);
            }
        }
    }

    jobs.sort_by(|a, b| {
        b.work_estimate()
            .partial_cmp(&a.work_estimate())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    jobs
}

/// Processes every dataset referenced by the selected tilesets in
/// parallel. Per-dataset failures are tolerated: the failing chart's tiles
/// will simply be absent downstream.
pub fn process_datasets(
    catalog: &Catalog,
    tilesets: &[&Tileset],
    options: &PipelineOptions,
) -> QueueOutcome {
    let jobs = ordered_jobs(catalog, tilesets);
    if jobs.is_empty() {
        return QueueOutcome::default();
    }

    info!(
        "processing {} datasets with {} workers ({} warp threads each)",
        jobs.len(),
        options.workers.min(jobs.len()),
        options.threads_per_job
    );

    let queue = JobQueue::new(jobs.len(), options.workers);
    let outcome = queue.run(
        |_worker_id| init_worker(),
        |index| {
            let dataset = jobs[index];
            match process_dataset(dataset, options) {
                Ok(()) => true,
                Err(err) => {
                    error!("dataset '{}' failed: {}", dataset.name, err);
                    false
                }
            }
        },
    );

    info!(
        "dataset processing complete: {} succeeded, {} failed",
        outcome.succeeded,
        outcome.failed + outcome.unattempted
    );
    outcome
}

/// Per-worker raster library setup: driver registration and the GeoTIFF
/// CRS policy. Charts ship CRS definitions in GeoKeys that predate the
/// EPSG registry entries GDAL would otherwise prefer.
fn init_worker() -> bool {
    DriverManager::register_all();
    gdal::config::set_config_option("GTIFF_SRS_SOURCE", "GEOKEYS").is_ok()
}
