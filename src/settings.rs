use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::{lines::DEFAULT_HEADING_MARKER, ScanOptions, DEFAULT_SKIP_PAGES};

const CONFIG_FILE: &str = "spec_organizer";
const ENV_PREFIX: &str = "SPEC";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub skip_pages: u32,
    pub heading_marker: String,
    pub output_dir: PathBuf,
    pub db_path: PathBuf,
    pub terms_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            skip_pages: DEFAULT_SKIP_PAGES,
            heading_marker: DEFAULT_HEADING_MARKER.to_string(),
            output_dir: PathBuf::from("output"),
            db_path: PathBuf::from("data/spec.sqlite"),
            terms_path: PathBuf::from("master_data.json"),
        }
    }
}

impl Settings {
    /// Defaults, then `spec_organizer.toml` if present, then `SPEC_*` env vars.
    pub fn load() -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read settings")?;
        cfg.try_deserialize()
            .context("Invalid settings")
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            skip_pages: self.skip_pages,
            heading_marker: self.heading_marker.clone(),
        }
    }
}
