use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::Resolution;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("TUBEDROP_", $v)
    };
}

/// Wrapper-tool around `yt-dlp` to list the streams of a video
/// or download one of them into a self-cleaning directory.
///
/// Every invocation first removes the downloads older than the retention window.
/// Responses are written to stdout as JSON, logs go to stderr.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The path to a TOML configuration file.
    /// If not set, `tubedrop.toml` is read from the working directory when it exists
    #[arg(long, global = true, env = arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// The maximum level of the logs
    #[arg(long, global = true, default_value_t = tracing::Level::INFO)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every usable stream of a video
    List {
        /// The URL of the video
        url: String,
    },

    /// Download the combined (video+audio) stream closest to a resolution
    Download {
        /// The URL of the video
        url: String,

        /// The wanted resolution, e.g. `720p`.
        /// Falls back to the highest available one if missing
        #[arg(long)]
        resolution: Option<Resolution>,

        /// The path to the output directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Only remove the expired downloads
    Sweep {
        /// The path to the output directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

impl Command {
    /// The output directory given on the command line, if any
    pub fn out_dir(&self) -> Option<&PathBuf> {
        match self {
            Command::List { .. } => None,
            Command::Download { out, .. } | Command::Sweep { out } => out.as_ref(),
        }
    }
}
