//! End-to-end flood overlay run: load, normalize, intersect, assemble, save.

use std::path::PathBuf;

use tracing::info;

use crate::assemble::{assemble, AssembleOptions};
use crate::crs::{normalize, CrsError};
use crate::error::Result;
use crate::geojson::{self, CoordinateFields, LoadOptions};
use crate::models::{FeatureCollection, Row};
use crate::pip::{intersect, intersect_parallel, GeometryWarning};

/// The three paths of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub zones: PathBuf,
    pub properties: PathBuf,
    pub output: PathBuf,
}

/// Knobs shared by every run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Spread the overlay over the rayon thread pool
    pub parallel: bool,
    pub load: LoadOptions,
    pub assemble: AssembleOptions,
    pub coordinates: CoordinateFields,
}

/// In-memory result of the overlay
#[derive(Debug, Clone)]
pub struct Analysis {
    pub rows: Vec<Row>,
    pub warnings: Vec<GeometryWarning>,
}

/// Counts reported after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub properties: usize,
    pub zones: usize,
    pub rows_written: usize,
    pub warnings: usize,
}

/// Overlay already-loaded collections without touching the filesystem.
///
/// Properties are reprojected into the zones' reference system first.
pub fn analyze(
    properties: FeatureCollection,
    zones: &FeatureCollection,
    options: &RunOptions,
) -> Result<Analysis> {
    let target = zones.crs.ok_or(CrsError::Undefined)?;
    let properties = normalize(properties, target)?;

    let overlay = if options.parallel {
        intersect_parallel(&properties, zones)?
    } else {
        intersect(&properties, zones)?
    };

    let rows = assemble(&overlay.matches, &options.assemble);
    Ok(Analysis {
        rows,
        warnings: overlay.warnings,
    })
}

/// Execute one job and write its output file.
pub fn run(job: &Job, options: &RunOptions) -> Result<RunSummary> {
    let zones = geojson::load_with(&job.zones, &options.load)?;
    let properties = geojson::load_with(&job.properties, &options.load)?;
    let property_count = properties.len();

    let analysis = analyze(properties, &zones, options)?;
    let rows_written = geojson::save_with(&analysis.rows, &job.output, &options.coordinates)?;

    let summary = RunSummary {
        properties: property_count,
        zones: zones.len(),
        rows_written,
        warnings: analysis.warnings.len(),
    };

    info!(
        "{} of {} properties at risk across {} zones ({} geometry warnings)",
        summary.rows_written, summary.properties, summary.zones, summary.warnings
    );

    Ok(summary)
}
