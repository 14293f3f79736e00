use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_READ_OUT: &str = "Number of at-risk properties: ";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub runs: Vec<RunConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    pub zones: PathBuf,
    pub properties: PathBuf,
    pub output: PathBuf,
    #[serde(default = "default_read_out")]
    pub read_out: String,
    #[serde(default)]
    pub zone_fields: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_longitude")]
    pub longitude_field: String,
    #[serde(default = "default_latitude")]
    pub latitude_field: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            longitude_field: default_longitude(),
            latitude_field: default_latitude(),
        }
    }
}

fn default_read_out() -> String {
    DEFAULT_READ_OUT.to_string()
}

fn default_longitude() -> String {
    "longitude".to_string()
}

fn default_latitude() -> String {
    "latitude".to_string()
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        if config.runs.is_empty() {
            bail!("Config file lists no [[runs]]");
        }
        Ok(config)
    }
}
