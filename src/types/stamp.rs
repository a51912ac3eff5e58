use miette::{Context, IntoDiagnostic};
use time::{
    format_description::FormatItem, macros::format_description, OffsetDateTime, PrimitiveDateTime,
    UtcOffset,
};

use crate::result::Result;

/// `YYYYMMDDHHMMSS`, the creation time embedded in output file names
const STAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");

/// Minimum number of `_` separated segments for a name to carry a stamp:
/// `<title>_<resolution>_<stamp>_<id>.<ext>`
const MIN_SEGMENTS: usize = 4;

/// Format a time as a file name stamp, in UTC
pub fn format_stamp(at: OffsetDateTime) -> Result<String> {
    Ok(at
        .to_offset(UtcOffset::UTC)
        .format(STAMP_FORMAT)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not format {at} as a file name stamp"))?)
}

/// Recover the creation time from an output file name.
///
/// The name is split on `_` and the second-to-last segment is read as a UTC stamp.
/// Return None if there are less than 4 segments or if the stamp does not parse.
pub fn parse_stamp_from_name(file_name: &str) -> Option<OffsetDateTime> {
    let parts: Vec<&str> = file_name.split('_').collect();
    if parts.len() < MIN_SEGMENTS {
        return None;
    }

    let stamp = parts[parts.len() - 2];
    if stamp.len() != 14 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    PrimitiveDateTime::parse(stamp, STAMP_FORMAT)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}
