use std::{
    fs,
    io::{self, ErrorKind},
    path::Path,
};

use miette::{Context, IntoDiagnostic};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::{
    io::STAGING_PREFIX,
    result::{Error, Result},
    types::parse_stamp_from_name,
};

/// Remove every file of the directory older than the retention window.
///
/// The age of a file is read from the stamp embedded in its name, or from its
/// modification time when the name carries none. Only regular files directly
/// inside the directory are considered, except for the staging directories
/// left behind by interrupted downloads: those are removed whole once nothing
/// in them was modified within the window.
///
/// A file that cannot be removed is logged and skipped, it never stops the sweep.
/// A missing directory has nothing to sweep.
///
/// Return the number of removed files, staging directories are not counted.
pub fn sweep(directory: &Path, now: OffsetDateTime, retention: Duration) -> Result<usize> {
    sweep_with(directory, now, retention, |path| fs::remove_file(path))
}

fn sweep_with<R>(
    directory: &Path,
    now: OffsetDateTime,
    retention: Duration,
    remove_file: R,
) -> Result<usize>
where
    R: Fn(&Path) -> io::Result<()>,
{
    let Some(cutoff) = now.checked_sub(retention) else {
        debug!("Retention window reaches before the earliest date, nothing expires");
        return Ok(0);
    };

    let entries = match directory.read_dir() {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist, nothing to sweep", directory.display());
            return Ok(0);
        }
        Err(err) => Err(err)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not read directory {}", directory.display()))?,
    };

    let mut removed = 0;
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                warn!("Could not read an entry of {}: {err}", directory.display());
                continue;
            }
        };

        if path.is_dir() {
            if file_name(&path).starts_with(STAGING_PREFIX) {
                reclaim_staging(&path, cutoff);
            }
            continue;
        }

        if !path.is_file() {
            continue;
        }

        let Some(created_at) = created_at(&path) else {
            continue;
        };

        if created_at < cutoff {
            match remove_file(&path) {
                Ok(()) => {
                    info!("Cleaned: {}", file_name(&path));
                    removed += 1;
                }
                Err(source) => warn!("{}", Error::DeletionFailed { path, source }),
            }
        }
    }

    if removed > 0 {
        info!("Cleaned up {removed} old files");
    } else {
        debug!("No old files to clean up");
    }

    Ok(removed)
}

/// Remove a staging directory whose last activity is older than the cutoff.
///
/// The last activity is the latest modification time of the directory and of
/// the files in it, so a download still being written is never removed.
fn reclaim_staging(path: &Path, cutoff: OffsetDateTime) {
    let last_activity = path
        .read_dir()
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| entry.metadata().and_then(|m| m.modified()).ok())
        .chain(fs::metadata(path).and_then(|m| m.modified()).ok())
        .max();

    let Some(last_activity) = last_activity.map(OffsetDateTime::from) else {
        warn!("Could not read modification time of {}", path.display());
        return;
    };

    if last_activity < cutoff {
        match fs::remove_dir_all(path) {
            Ok(()) => info!("Cleaned stale staging directory: {}", file_name(path)),
            Err(source) => warn!(
                "{}",
                Error::DeletionFailed {
                    path: path.to_path_buf(),
                    source
                }
            ),
        }
    }
}

/// Creation time of an output file, falling back to its modification time.
/// Return None if neither can be read, e.g. if the file was removed concurrently.
fn created_at(path: &Path) -> Option<OffsetDateTime> {
    if let Some(at) = parse_stamp_from_name(&file_name(path)) {
        return Some(at);
    }

    warn!(
        "Could not parse timestamp from filename: {}. Using modification time",
        file_name(path)
    );

    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => Some(OffsetDateTime::from(modified)),
        Err(err) => {
            warn!("Could not read modification time of {}: {err}", path.display());
            None
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
