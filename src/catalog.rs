use std::cmp::Reverse;

use tracing::{debug, trace};

use crate::{
    result::{Error, Result},
    types::{Catalog, RawFormat, Resolution, StreamDescriptor, StreamKind},
};

/// Container assumed when the resolver does not give one
const DEFAULT_CONTAINER: &str = "mp4";

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Build the sorted catalog of usable streams out of the resolver's format records.
///
/// Records without a source URL or whose kind is unknown are dropped.
/// The catalog is ordered by kind (combined, then audio-only, then video-only),
/// then by decreasing resolution, then by format id.
///
/// Return [`Error::NoStreamsFound`] if no record is usable.
pub fn build_catalog(raw_formats: &[RawFormat]) -> Result<Catalog> {
    let catalog = collect_streams(raw_formats);

    if catalog.is_empty() {
        Err(Error::NoStreamsFound)
    } else {
        Ok(catalog)
    }
}

/// Same as [`build_catalog`] but an empty catalog is not an error
pub fn collect_streams(raw_formats: &[RawFormat]) -> Catalog {
    let mut streams: Vec<StreamDescriptor> = raw_formats.iter().filter_map(to_descriptor).collect();

    streams.sort_by_key(|s| {
        (
            s.kind.priority(),
            Reverse(s.sort_height()),
            s.format_id.clone(),
        )
    });

    debug!(
        "{} usable streams out of {} formats",
        streams.len(),
        raw_formats.len()
    );

    Catalog::new(streams)
}

fn to_descriptor(raw: &RawFormat) -> Option<StreamDescriptor> {
    if raw.url.is_empty() {
        trace!("Format '{}' has no source URL, skipping it", raw.format_id);
        return None;
    }

    let kind = StreamKind::from_codecs(raw.vcodec.as_deref(), raw.acodec.as_deref());
    if kind == StreamKind::Unknown {
        trace!("Format '{}' has no codec, skipping it", raw.format_id);
        return None;
    }

    let resolution = match kind {
        StreamKind::AudioOnly => None,
        _ => raw.height.map(Resolution::from_height),
    };

    Some(StreamDescriptor {
        kind,
        resolution,
        frame_rate: raw.fps.map(|fps| fps.round() as u32),
        video_codec: raw.vcodec.clone(),
        audio_codec: raw.acodec.clone(),
        container: raw
            .ext
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTAINER.to_owned()),
        approx_size_mb: raw.filesize.or(raw.filesize_approx).map(bytes_to_mb),
        source_url: raw.url.clone(),
        format_id: raw.format_id.clone(),
    })
}

/// Convert a byte count to mebibytes, rounded to 2 decimals
fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn raw(
        format_id: &str,
        vcodec: Option<&str>,
        acodec: Option<&str>,
        height: Option<u32>,
    ) -> RawFormat {
        RawFormat {
            format_id: format_id.to_owned(),
            vcodec: vcodec.map(str::to_owned),
            acodec: acodec.map(str::to_owned),
            height,
            ext: Some("mp4".to_owned()),
            url: format!("https://media.example/{format_id}"),
            ..RawFormat::default()
        }
    }

    fn kinds_and_heights(catalog: &Catalog) -> Vec<(StreamKind, u32)> {
        catalog.iter().map(|s| (s.kind, s.sort_height())).collect()
    }

    #[test]
    fn sorts_by_kind_then_descending_resolution() {
        let formats = [
            raw("137", Some("avc1"), None, Some(1080)),
            raw("18", Some("avc1"), Some("mp4a"), Some(360)),
            raw("140", None, Some("mp4a"), None),
            raw("22", Some("avc1"), Some("mp4a"), Some(720)),
            raw("136", Some("avc1"), None, Some(720)),
            raw("251", None, Some("opus"), None),
        ];

        let catalog = build_catalog(&formats).unwrap();
        assert_eq!(
            kinds_and_heights(&catalog),
            vec![
                (StreamKind::Combined, 720),
                (StreamKind::Combined, 360),
                (StreamKind::AudioOnly, 0),
                (StreamKind::AudioOnly, 0),
                (StreamKind::VideoOnly, 1080),
                (StreamKind::VideoOnly, 720),
            ]
        );

        // Ties are ordered by format id
        assert_eq!(catalog[2].format_id, "140");
        assert_eq!(catalog[3].format_id, "251");
    }

    #[test]
    fn drops_empty_urls_and_unknown_kinds() {
        let mut no_url = raw("22", Some("avc1"), Some("mp4a"), Some(720));
        no_url.url.clear();
        let storyboard = raw("sb0", None, None, Some(90));
        let good = raw("18", Some("avc1"), Some("mp4a"), Some(360));

        let catalog = build_catalog(&[no_url, storyboard, good]).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].format_id, "18");
        assert!(catalog.iter().all(|s| !s.source_url.is_empty()));
    }

    #[test]
    fn empty_catalog_is_reported() {
        let storyboard = raw("sb0", None, None, None);
        assert!(matches!(
            build_catalog(&[storyboard]),
            Err(Error::NoStreamsFound)
        ));
        assert!(matches!(build_catalog(&[]), Err(Error::NoStreamsFound)));
    }

    #[test]
    fn normalizes_fields() {
        let mut combined = raw("22", Some("avc1"), Some("mp4a"), Some(720));
        combined.fps = Some(29.97);
        combined.filesize = None;
        combined.filesize_approx = Some(5_500_000);
        combined.ext = None;

        let mut audio = raw("140", None, Some("mp4a"), Some(0));
        audio.filesize = Some(1_048_576);

        let catalog = build_catalog(&[combined, audio]).unwrap();

        let combined = &catalog[0];
        assert_eq!(combined.resolution, Some(Resolution::from_height(720)));
        assert_eq!(combined.frame_rate, Some(30));
        assert_eq!(combined.approx_size_mb, Some(5.25));
        assert_eq!(combined.container, "mp4");

        let audio = &catalog[1];
        assert_eq!(audio.kind, StreamKind::AudioOnly);
        assert_eq!(audio.resolution, None);
        assert_eq!(audio.video_codec, None);
        assert_eq!(audio.approx_size_mb, Some(1.0));
    }
}
