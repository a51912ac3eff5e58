use std::{fmt::Display, path::PathBuf};

use miette::miette;

#[derive(Debug)]
pub enum Error {
    /// The URL is not a recognized video URL
    InvalidUrl(String),

    /// The video is private, removed or blocked
    VideoUnavailable(String),

    /// The resolver returned no usable encoding
    NoStreamsFound,

    /// No combined (video+audio) stream can satisfy a single-file request
    NoProgressiveStreamAvailable,

    /// The transfer of the selected stream failed
    DownloadFailed(miette::Report),

    /// A file could not be removed during a sweep.
    /// Never returned by the sweep itself, only logged.
    DeletionFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The resolver failed for a reason it did not classify
    Resolver(miette::Report),

    Miette(miette::Report),
}

impl Error {
    /// Stable identifier of the error, used in the JSON responses
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidUrl(_) => "invalid_url",
            Error::VideoUnavailable(_) => "video_unavailable",
            Error::NoStreamsFound => "no_streams_found",
            Error::NoProgressiveStreamAvailable => "no_progressive_stream_available",
            Error::DownloadFailed(_) => "download_failed",
            Error::DeletionFailed { .. } => "deletion_failed",
            Error::Resolver(_) => "resolver_error",
            Error::Miette(_) => "internal_error",
        }
    }

    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            Error::Resolver(report) => Error::Resolver(report.wrap_err(f())),
            Error::DownloadFailed(report) => Error::DownloadFailed(report.wrap_err(f())),
            err => err,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidUrl(url) => write!(f, "Invalid video URL format: '{url}'"),
            Error::VideoUnavailable(reason) => {
                write!(f, "The video is unavailable or private: {reason}")
            }
            Error::NoStreamsFound => write!(f, "No usable stream found for this video"),
            Error::NoProgressiveStreamAvailable => write!(
                f,
                "No progressive (video+audio) stream found for this video at any resolution"
            ),
            Error::DownloadFailed(report) => write!(f, "Download failed: {report:#}"),
            Error::DeletionFailed { path, source } => {
                write!(f, "Could not delete '{}': {source}", path.display())
            }
            Error::Resolver(report) => write!(f, "Could not resolve the video: {report:#}"),
            Error::Miette(report) => write!(f, "{report:#}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DeletionFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::Miette(err) => err,
            err => miette!("{err}"),
        }
    }
}

/// Build an unclassified error from a message
pub fn err_msg<D: Display>(msg: D) -> Error {
    Error::Miette(miette!("{msg}"))
}

/// Return early with an unclassified error
pub fn bail<T, D: Display>(msg: D) -> Result<T> {
    Err(err_msg(msg))
}

pub type Result<T> = std::result::Result<T, Error>;
