use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use miette::{Context, IntoDiagnostic};
use serde::Deserialize;
use time::Duration;

use crate::{result::Result, types::Resolution};

pub const DEFAULT_OUTPUT_DIR: &str = "temp_downloads";
pub const DEFAULT_RETENTION_MINUTES: u64 = 5;
pub const DEFAULT_RESOLUTION: &str = "720p";

/// Name of the configuration file looked up in the working directory
const LOCAL_CONFIG_NAME: &str = "tubedrop";
const ENV_PREFIX: &str = "TUBEDROP";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Where downloads are written, and what the sweeper cleans
    pub output_dir: PathBuf,

    /// How long a download is kept before the sweeper removes it
    pub retention_minutes: u64,

    /// Resolution requested when none is given
    pub default_resolution: Resolution,
}

impl Settings {
    /// Load the settings: defaults, then the configuration file, then the environment.
    ///
    /// If no file is given, `tubedrop.toml` is read from the working directory if it exists.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(LOCAL_CONFIG_NAME).required(false),
        };

        Self::load_from(file_source, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(
        file: File<config::FileSourceFile, config::FileFormat>,
        env: Environment,
    ) -> Result<Self> {
        let settings = Config::builder()
            .set_default("output_dir", DEFAULT_OUTPUT_DIR)
            .into_diagnostic()?
            .set_default("retention_minutes", DEFAULT_RETENTION_MINUTES)
            .into_diagnostic()?
            .set_default("default_resolution", DEFAULT_RESOLUTION)
            .into_diagnostic()?
            .add_source(file)
            .add_source(env.try_parsing(true))
            .build()
            .into_diagnostic()
            .wrap_err("Could not load the configuration")?
            .try_deserialize()
            .into_diagnostic()
            .wrap_err("Invalid configuration")?;

        Ok(settings)
    }

    /// The retention window as a duration, saturating on absurdly large values
    pub fn retention_window(&self) -> Duration {
        i64::try_from(self.retention_minutes)
            .ok()
            .and_then(|minutes| minutes.checked_mul(60))
            .map_or(Duration::MAX, Duration::seconds)
    }
}
