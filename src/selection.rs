use tracing::{debug, warn};

use crate::{
    result::{Error, Result},
    types::{Catalog, Resolution, StreamDescriptor},
};

/// Pick the combined (video+audio) stream to download.
///
/// Only combined streams are considered, as the result must be playable on its own.
/// The stream with the desired resolution is chosen if there is one.
/// Otherwise, fall back to the highest resolution combined stream.
pub fn select_stream<'a>(catalog: &'a Catalog, desired: &Resolution) -> Result<&'a StreamDescriptor> {
    if let Some(stream) = catalog
        .combined()
        .find(|s| s.resolution.as_ref() == Some(desired))
    {
        debug!("Found combined stream '{}' at {desired}", stream.format_id);
        return Ok(stream);
    }

    // The catalog is sorted by decreasing resolution
    let fallback = catalog
        .combined()
        .next()
        .ok_or(Error::NoProgressiveStreamAvailable)?;

    warn!(
        "Resolution {desired} not available, falling back to {}",
        fallback
            .resolution
            .map_or_else(|| "unknown resolution".to_owned(), |r| r.to_string())
    );

    Ok(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{build_catalog, tests::raw};

    fn res(label: &str) -> Resolution {
        label.parse().unwrap()
    }

    #[test]
    fn exact_match_wins() {
        let catalog = build_catalog(&[
            raw("22", Some("avc1"), Some("mp4a"), Some(720)),
            raw("18", Some("avc1"), Some("mp4a"), Some(360)),
        ])
        .unwrap();

        assert_eq!(select_stream(&catalog, &res("360p")).unwrap().format_id, "18");
        assert_eq!(select_stream(&catalog, &res("720p")).unwrap().format_id, "22");
    }

    #[test]
    fn falls_back_to_highest_combined() {
        let catalog = build_catalog(&[
            raw("18", Some("avc1"), Some("mp4a"), Some(360)),
            raw("22", Some("avc1"), Some("mp4a"), Some(720)),
            raw("137", Some("avc1"), None, Some(1080)),
        ])
        .unwrap();

        let selected = select_stream(&catalog, &res("1080p")).unwrap();
        assert_eq!(selected.format_id, "22");
    }

    #[test]
    fn adaptive_streams_are_never_selected() {
        let catalog = build_catalog(&[
            raw("137", Some("avc1"), None, Some(1080)),
            raw("140", None, Some("mp4a"), None),
        ])
        .unwrap();

        assert!(matches!(
            select_stream(&catalog, &res("1080p")),
            Err(Error::NoProgressiveStreamAvailable)
        ));
    }

    #[test]
    fn empty_catalog_has_no_progressive_stream() {
        assert!(matches!(
            select_stream(&Catalog::default(), &res("720p")),
            Err(Error::NoProgressiveStreamAvailable)
        ));
    }
}
