//! Flood risk overlay.
//!
//! Loads flood zone polygons and property points, flags every property that
//! lies inside a zone and writes the at-risk properties as GeoJSON.

mod config;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use floodmark::assemble::AssembleOptions;
use floodmark::geojson::{CoordinateFields, LoadOptions};
use floodmark::pipeline::{self, Job, RunOptions};

use crate::config::{Config, RunConfig, DEFAULT_READ_OUT};

#[derive(Parser, Debug)]
#[command(name = "floodmark")]
#[command(about = "Flag properties that fall inside flood-risk zones")]
struct Args {
    /// TOML file listing one or more runs
    #[arg(short, long, conflicts_with_all = ["zones", "properties", "output"])]
    config: Option<PathBuf>,

    /// Flood zone GeoJSON (polygons)
    #[arg(long, requires_all = ["properties", "output"])]
    zones: Option<PathBuf>,

    /// Property GeoJSON (points)
    #[arg(long, requires_all = ["zones", "output"])]
    properties: Option<PathBuf>,

    /// Output GeoJSON, overwritten if present
    #[arg(short, long, requires_all = ["zones", "properties"])]
    output: Option<PathBuf>,

    /// Text printed before the at-risk count
    #[arg(long, default_value = DEFAULT_READ_OUT)]
    read_out: String,

    /// Zone attribute to copy onto each at-risk property (repeatable)
    #[arg(long = "zone-field")]
    zone_fields: Vec<String>,

    /// Run the overlay on all cores
    #[arg(long)]
    parallel: bool,

    /// Reject files that do not declare a CRS instead of assuming WGS-84
    #[arg(long)]
    strict_crs: bool,
}

impl Args {
    fn runs(&self) -> Result<(Vec<RunConfig>, CoordinateFields)> {
        if let Some(path) = &self.config {
            let config = Config::load_from_file(path)
                .with_context(|| format!("Loading config {}", path.display()))?;
            let fields = CoordinateFields {
                longitude: config.output.longitude_field,
                latitude: config.output.latitude_field,
            };
            return Ok((config.runs, fields));
        }

        match (&self.zones, &self.properties, &self.output) {
            (Some(zones), Some(properties), Some(output)) => Ok((
                vec![RunConfig {
                    zones: zones.clone(),
                    properties: properties.clone(),
                    output: output.clone(),
                    read_out: self.read_out.clone(),
                    zone_fields: self.zone_fields.clone(),
                }],
                CoordinateFields::default(),
            )),
            _ => anyhow::bail!("Pass either --config or all of --zones, --properties and --output"),
        }
    }
}

/// Execute every requested run, writing `<read_out><count>` per run to `out`.
fn execute<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    let (runs, coordinates) = args.runs()?;

    info!("Floodmark: {} run(s)", runs.len());

    for run in runs {
        let job = Job {
            zones: run.zones,
            properties: run.properties,
            output: run.output,
        };
        let options = RunOptions {
            parallel: args.parallel,
            load: LoadOptions {
                assume_wgs84: !args.strict_crs,
            },
            assemble: AssembleOptions {
                zone_fields: run.zone_fields,
            },
            coordinates: coordinates.clone(),
        };

        let summary = pipeline::run(&job, &options).with_context(|| {
            format!(
                "Overlaying {} onto {}",
                job.properties.display(),
                job.zones.display()
            )
        })?;

        writeln!(out, "{}{}", run.read_out, summary.rows_written)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries the read-out lines
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    execute(&args, &mut std::io::stdout().lock())
}
