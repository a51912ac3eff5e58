use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use miette::{Context, IntoDiagnostic};
use tempfile::TempDir;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{result::Result, types::format_stamp};

/// Maximum number of characters kept from the title in a file name
const MAX_SLUG_LEN: usize = 50;

/// Slug used when nothing of the title can be kept
const EMPTY_SLUG: &str = "video";

/// Name prefix of the hidden directories downloads are staged in
pub const STAGING_PREFIX: &str = ".staging-";

/// Keep the characters of the title that are safe in a file name.
///
/// Alphanumerics, spaces, dots and underscores are kept, spaces become
/// underscores and the result is cut to 50 characters.
pub fn title_slug(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|&c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_'))
        .collect();

    let slug: String = kept
        .trim()
        .replace(' ', "_")
        .chars()
        .take(MAX_SLUG_LEN)
        .collect();

    if slug.is_empty() {
        EMPTY_SLUG.to_owned()
    } else {
        slug
    }
}

/// 8 random lowercase hex characters
pub fn short_id() -> String {
    format!("{:08x}", fastrand::u32(..))
}

/// Build the name of an output file: `<title>_<resolution>_<stamp>_<id>.<ext>`.
///
/// The stamp is what the sweeper reads back to know when the file was created.
pub fn output_file_name(
    title: &str,
    resolution: &str,
    created_at: OffsetDateTime,
    id: &str,
    ext: &str,
) -> Result<String> {
    Ok(format!(
        "{}_{resolution}_{}_{id}.{ext}",
        title_slug(title),
        format_stamp(created_at)?
    ))
}

/// Create a hidden staging directory inside the output directory.
///
/// Downloads land there first so that a partial file never carries a final name.
/// The directory and what remains in it are removed when the handle is dropped.
/// If the process dies before that, the sweeper reclaims it once it is stale.
pub fn staging_dir(out_dir: &Path) -> Result<TempDir> {
    Ok(tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(out_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not create a staging directory in {}", out_dir.display()))?)
}

/// Move a finished file to its final location
pub fn move_into_place(from: &Path, to: &Path) -> Result<PathBuf> {
    // First try to do a simple move
    if fs::rename(from, to).is_err() {
        debug!("Moving file failed, falling back to copying");
        let copied = fs::copy(from, to)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not copy {} to {}", from.display(), to.display()));

        if copied.is_err() {
            // Never leave a truncated file under the final name
            if let Err(err) = fs::remove_file(to) {
                if err.kind() != ErrorKind::NotFound {
                    warn!("Could not remove the partial copy {}: {err}", to.display());
                }
            }
        }
        copied?;
    }

    Ok(to.to_path_buf())
}
