mod catalog;
mod cli;
mod io;
mod logging;
mod outside;
mod response;
mod result;
mod selection;
mod service;
mod settings;
mod sweeper;
mod types;
mod video_url;

use std::process::ExitCode;

use clap::Parser;
use miette::{Context, IntoDiagnostic};
use time::OffsetDateTime;
use tracing::{debug, error, info};

use crate::{
    cli::{Args, Command},
    outside::Ytdl,
    response::Response,
    result::{Error, Result},
    service::{run_retention_sweep, Service},
    settings::Settings,
};

fn main() -> miette::Result<ExitCode> {
    let args = Args::parse();
    logging::init_logging(args.log_level)?;

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(out) = args.command.out_dir() {
        settings.output_dir = out.clone();
    }
    if let Command::Download {
        resolution: Some(resolution),
        ..
    } = &args.command
    {
        settings.default_resolution = *resolution;
    }
    debug!("{settings:?}");

    std::fs::create_dir_all(&settings.output_dir)
        .into_diagnostic()
        .wrap_err("Could not create the output directory")?;

    let response = match run(&args.command, &settings) {
        Ok(response) => response,
        Err(Error::Miette(report)) => return Err(report),
        Err(err) => {
            error!("{err}");
            Response::error(&err)
        }
    };

    println!("{}", response.to_json());
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Sweep the output directory, then execute the command
fn run(command: &Command, settings: &Settings) -> Result<Response> {
    let now = OffsetDateTime::now_utc();

    let removed_files = run_retention_sweep(&settings.output_dir, now, settings.retention_window())
        .map_err(|err| err.wrap_err_with(|| "Could not sweep the expired files"))?;
    if removed_files > 0 {
        info!("Removed {removed_files} expired files");
    }

    let response = match command {
        Command::List { url } => {
            let ytdl = Ytdl::new()?;
            let listing = Service::new(&ytdl).list_streams(url)?;
            Response::listing(listing, removed_files)
        }
        Command::Download { url, .. } => {
            let ytdl = Ytdl::new()?;
            let output = Service::new(&ytdl).download_selected(
                url,
                &settings.default_resolution,
                &settings.output_dir,
                now,
            )?;
            Response::download(&output, settings.retention_minutes, removed_files)
        }
        Command::Sweep { .. } => Response::sweep(removed_files),
    };

    Ok(response)
}
