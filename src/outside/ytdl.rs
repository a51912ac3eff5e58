use std::{ffi::OsStr, path::Path, process::Command};

use miette::{miette, Context, IntoDiagnostic};

use super::command::{assert_success_command, run_command, Capture, YT_DL, YT_DLP};
use crate::{
    result::{bail, Error, Result},
    types::VideoInfo,
};

/// Interface for the program that knows how to enumerate and fetch the streams of a video
pub trait MediaResolver {
    /// Get the video title and the list of its available formats
    fn resolve(&self, url: &str) -> Result<VideoInfo>;

    /// Download the format with the given ID of the video to the path.
    fn download(&self, url: &str, format_id: &str, path: &Path) -> Result<()>;
}

/// Interface for the [youtube-dl](https://github.com/ytdl-org/youtube-dl) program
pub struct Ytdl {
    program: &'static str,
}

impl Ytdl {
    /// Verify that the `yt-dlp` or `youtube-dl` binaries are reachable
    pub fn new() -> Result<Self> {
        // Check `yt-dlp`
        if assert_success_command(YT_DLP, |cmd| cmd.arg("--version")).is_ok() {
            Ok(Self { program: YT_DLP })
        } else if assert_success_command(YT_DL, |cmd| cmd.arg("--version")).is_ok() {
            // Check `youtube-dl`
            Ok(Self { program: YT_DL })
        } else {
            bail("Neither yt-dlp nor youtube-dl found")
        }
    }

    /// Run the command and classify its failure from what it printed on stderr.
    ///
    /// On success, return the captured stdout.
    /// Failures not recognized by [`classify_stderr`] are built with `otherwise`.
    fn run_classified<F, E>(&self, f: F, capture: Capture, otherwise: E) -> Result<Vec<u8>>
    where
        F: FnOnce(&mut Command) -> &mut Command,
        E: FnOnce(miette::Report) -> Error,
    {
        let res = run_command(self.program, f, capture | Capture::STDERR)?;

        let stderr = String::from_utf8_lossy(&res.stderr);
        if let Some(err) = classify_stderr(&stderr) {
            return Err(err);
        }

        if res.status.success() {
            Ok(res.stdout)
        } else {
            Err(otherwise(miette!(
                "{} exited with {}: {}",
                self.program,
                res.status,
                last_error_line(&stderr).unwrap_or("no error message")
            )))
        }
    }
}

impl MediaResolver for Ytdl {
    fn resolve(&self, url: &str) -> Result<VideoInfo> {
        let stdout = self.run_classified(
            |cmd| {
                cmd.arg("-q")
                    .arg("--no-playlist")
                    .arg("--skip-download")
                    .arg("-J")
                    .arg("--")
                    .arg(url)
            },
            Capture::STDOUT,
            Error::Resolver,
        )?;

        serde_json::from_slice::<VideoInfo>(&stdout)
            .into_diagnostic()
            .wrap_err("Could not parse the video JSON")
            .map_err(Error::Resolver)
    }

    fn download(&self, url: &str, format_id: &str, path: &Path) -> Result<()> {
        self.run_classified(
            |cmd| cmd.args(download_args(url, format_id, path)),
            Capture::empty(),
            Error::DownloadFailed,
        )?;

        Ok(())
    }
}

/// Arguments of a download, understood by both `yt-dlp` and `youtube-dl`.
/// The staging target is always fresh, so nothing has to be overwritten.
fn download_args<'a>(url: &'a str, format_id: &'a str, path: &'a Path) -> Vec<&'a OsStr> {
    vec![
        OsStr::new("-q"),
        OsStr::new("--no-playlist"),
        OsStr::new("--no-part"),
        OsStr::new("-f"),
        OsStr::new(format_id),
        OsStr::new("-o"),
        path.as_os_str(),
        OsStr::new("--"),
        OsStr::new(url),
    ]
}

/// Phrases of the resolver meaning the video itself cannot be obtained
const UNAVAILABLE_PHRASES: &[&str] = &[
    "video unavailable",
    "private video",
    "available in your country",
    "video has been removed",
    "video is unavailable",
];

const INVALID_URL_PHRASES: &[&str] = &["is not a valid url", "unsupported url"];

/// Map the error lines of the resolver to the error they describe, if known.
///
/// HTTP failures are transient and never classified, whatever their reason text.
pub fn classify_stderr(stderr: &str) -> Option<Error> {
    stderr
        .lines()
        .filter(|line| line.starts_with("ERROR:"))
        .find_map(|line| {
            let lower = line.to_lowercase();
            if lower.contains("http error") {
                return None;
            }

            let message = line.trim_start_matches("ERROR:").trim().to_owned();
            let has_any = |phrases: &[&str]| phrases.iter().any(|p| lower.contains(p));

            if has_any(UNAVAILABLE_PHRASES) {
                Some(Error::VideoUnavailable(message))
            } else if has_any(INVALID_URL_PHRASES) {
                Some(Error::InvalidUrl(message))
            } else {
                None
            }
        })
}

fn last_error_line(stderr: &str) -> Option<&str> {
    stderr.lines().rev().find(|line| line.starts_with("ERROR:"))
}
