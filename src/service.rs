use std::path::{Path, PathBuf};

use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::{
    catalog::{build_catalog, collect_streams},
    io::{move_into_place, output_file_name, short_id, staging_dir},
    outside::MediaResolver,
    result::{Error, Result},
    selection::select_stream,
    sweeper,
    types::{Catalog, Resolution, StreamDescriptor, VideoInfo},
    video_url,
};

/// The streams of a video, as listed to the user
#[derive(Debug)]
pub struct StreamListing {
    pub video_title: String,
    pub streams: Catalog,
}

/// A download materialized in the output directory
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: PathBuf,
    pub created_at: OffsetDateTime,
    pub video_title: String,
    pub stream: StreamDescriptor,
}

impl OutputFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The resolution that was actually downloaded
    pub fn resolution(&self) -> Option<Resolution> {
        self.stream.resolution
    }
}

/// Entry point of the operations, on top of a media resolver
pub struct Service<'a> {
    resolver: &'a dyn MediaResolver,
}

impl<'a> Service<'a> {
    pub fn new(resolver: &'a dyn MediaResolver) -> Self {
        Self { resolver }
    }

    /// List every usable stream of the video
    pub fn list_streams(&self, url: &str) -> Result<StreamListing> {
        let info = self.resolve(url)?;
        let streams = build_catalog(&info.formats)?;

        info!("{} streams available for '{}'", streams.len(), info.title);
        Ok(StreamListing {
            video_title: info.title,
            streams,
        })
    }

    /// Download the combined stream closest to the desired resolution into the output directory.
    ///
    /// The file name embeds `now` so that later sweeps know when it was created.
    pub fn download_selected(
        &self,
        url: &str,
        desired: &Resolution,
        out_dir: &Path,
        now: OffsetDateTime,
    ) -> Result<OutputFile> {
        let info = self.resolve(url)?;

        // No stream at all means no progressive stream either
        let catalog = collect_streams(&info.formats);
        let stream = select_stream(&catalog, desired)?.clone();

        let resolution = stream
            .resolution
            .map_or_else(|| "unknown".to_owned(), |r| r.to_string());
        let file_name =
            output_file_name(&info.title, &resolution, now, &short_id(), &stream.container)?;
        let path = out_dir.join(&file_name);

        if path.exists() {
            info!("'{file_name}' already exists in the output directory");
        } else {
            info!("Downloading '{}' at {resolution}...", info.title);
            self.fetch_into(url, &stream, out_dir, &path)?;
            info!("Downloaded '{}' temporarily to: {}", info.title, path.display());
        }

        Ok(OutputFile {
            path,
            created_at: now,
            video_title: info.title,
            stream,
        })
    }

    fn resolve(&self, url: &str) -> Result<VideoInfo> {
        let id = video_url::video_id(url).ok_or_else(|| Error::InvalidUrl(url.to_owned()))?;
        debug!("Resolving video {id}");

        let info = self.resolver.resolve(url)?;
        debug!(
            "Resolved '{}' ({}) with {} formats",
            info.title,
            info.id,
            info.formats.len()
        );
        Ok(info)
    }

    /// Download through a staging directory, then move the file to `path`
    fn fetch_into(
        &self,
        url: &str,
        stream: &StreamDescriptor,
        out_dir: &Path,
        path: &Path,
    ) -> Result<()> {
        let staging = staging_dir(out_dir)?;
        let staged = staging.path().join(format!("download.{}", stream.container));

        self.resolver
            .download(url, &stream.format_id, &staged)
            .map_err(|err| match err {
                Error::Miette(report) => Error::DownloadFailed(report),
                err => err,
            })?;

        if !staged.is_file() {
            return Err(Error::DownloadFailed(miette::miette!(
                "Video file was not created"
            )));
        }

        move_into_place(&staged, path).map_err(|err| match err {
            Error::Miette(report) => Error::DownloadFailed(report),
            err => err,
        })?;

        Ok(())
    }
}

/// Remove the expired files of the output directory.
/// Meant to run before any new output is produced.
pub fn run_retention_sweep(directory: &Path, now: OffsetDateTime, retention: Duration) -> Result<usize> {
    sweeper::sweep(directory, now, retention)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, fs};

    use miette::miette;
    use time::macros::datetime;

    use super::*;
    use crate::{
        catalog::tests::raw,
        types::{RawFormat, StreamKind},
    };

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    /// Resolver answering from memory, and writing the format id as file content
    struct FakeResolver {
        formats: Vec<RawFormat>,
        fail_with: Option<fn() -> Error>,
        downloads: RefCell<Vec<String>>,
        write_file: bool,
    }

    impl FakeResolver {
        fn new(formats: Vec<RawFormat>) -> Self {
            Self {
                formats,
                fail_with: None,
                downloads: RefCell::new(vec![]),
                write_file: true,
            }
        }
    }

    impl MediaResolver for FakeResolver {
        fn resolve(&self, _url: &str) -> Result<VideoInfo> {
            if let Some(fail_with) = self.fail_with {
                return Err(fail_with());
            }

            Ok(VideoInfo {
                id: "dQw4w9WgXcQ".to_owned(),
                title: "My Video".to_owned(),
                formats: self.formats.clone(),
            })
        }

        fn download(&self, _url: &str, format_id: &str, path: &Path) -> Result<()> {
            self.downloads.borrow_mut().push(format_id.to_owned());
            if self.write_file {
                fs::write(path, format_id).map_err(|err| miette!("{err}"))?;
            }
            Ok(())
        }
    }

    fn three_formats() -> Vec<RawFormat> {
        vec![
            raw("137", Some("avc1"), None, Some(1080)),
            raw("22", Some("avc1"), Some("mp4a"), Some(720)),
            raw("140", None, Some("mp4a"), None),
        ]
    }

    fn res(label: &str) -> Resolution {
        label.parse().unwrap()
    }

    #[test]
    fn lists_streams_in_catalog_order() {
        let resolver = FakeResolver::new(three_formats());
        let listing = Service::new(&resolver).list_streams(URL).unwrap();

        let kinds: Vec<_> = listing.streams.iter().map(|s| (s.kind, s.format_id.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (StreamKind::Combined, "22"),
                (StreamKind::AudioOnly, "140"),
                (StreamKind::VideoOnly, "137"),
            ]
        );
        assert_eq!(listing.video_title, "My Video");
    }

    #[test]
    fn download_falls_back_to_the_only_combined_stream() {
        let out = tempfile::tempdir().unwrap();
        let resolver = FakeResolver::new(three_formats());
        let now = datetime!(2024-01-01 12:00:00 UTC);

        let output = Service::new(&resolver)
            .download_selected(URL, &res("1080p"), out.path(), now)
            .unwrap();

        assert_eq!(output.stream.format_id, "22");
        assert_eq!(output.resolution(), Some(res("720p")));
        assert_eq!(*resolver.downloads.borrow(), vec!["22".to_owned()]);
        assert_eq!(fs::read_to_string(&output.path).unwrap(), "22");

        let name = output.file_name();
        assert!(name.starts_with("My_Video_720p_20240101120000_"), "{name}");
        assert!(name.ends_with(".mp4"), "{name}");

        // Only the output is left, the staging directory is gone
        let entries: Vec<_> = fs::read_dir(out.path()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn downloads_are_swept_once_expired() {
        let out = tempfile::tempdir().unwrap();
        let resolver = FakeResolver::new(three_formats());
        let now = datetime!(2024-01-01 12:00:00 UTC);

        let output = Service::new(&resolver)
            .download_selected(URL, &res("720p"), out.path(), now)
            .unwrap();

        let window = Duration::minutes(5);
        assert_eq!(run_retention_sweep(out.path(), now + Duration::minutes(4), window).unwrap(), 0);
        assert!(output.path.exists());
        assert_eq!(run_retention_sweep(out.path(), now + Duration::minutes(6), window).unwrap(), 1);
        assert!(!output.path.exists());
    }

    #[test]
    fn no_combined_stream_is_reported() {
        let out = tempfile::tempdir().unwrap();
        let resolver = FakeResolver::new(vec![
            raw("137", Some("avc1"), None, Some(1080)),
            raw("140", None, Some("mp4a"), None),
        ]);

        let err = Service::new(&resolver)
            .download_selected(URL, &res("720p"), out.path(), OffsetDateTime::now_utc())
            .unwrap_err();

        assert!(matches!(err, Error::NoProgressiveStreamAvailable));
        assert!(resolver.downloads.borrow().is_empty());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_formats_are_reported_per_operation() {
        let out = tempfile::tempdir().unwrap();
        let resolver = FakeResolver::new(vec![]);
        let service = Service::new(&resolver);

        assert!(matches!(service.list_streams(URL), Err(Error::NoStreamsFound)));
        assert!(matches!(
            service.download_selected(URL, &res("720p"), out.path(), OffsetDateTime::now_utc()),
            Err(Error::NoProgressiveStreamAvailable)
        ));
    }

    #[test]
    fn invalid_urls_never_reach_the_resolver() {
        let mut resolver = FakeResolver::new(three_formats());
        resolver.fail_with = Some(|| panic!("resolver must not be called"));

        let err = Service::new(&resolver).list_streams("https://example.com/video").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn resolver_errors_propagate_unchanged() {
        let mut resolver = FakeResolver::new(three_formats());
        resolver.fail_with = Some(|| Error::VideoUnavailable("Private video".to_owned()));

        let err = Service::new(&resolver).list_streams(URL).unwrap_err();
        assert!(matches!(err, Error::VideoUnavailable(reason) if reason == "Private video"));
    }

    #[test]
    fn missing_file_after_download_is_a_failure() {
        let out = tempfile::tempdir().unwrap();
        let mut resolver = FakeResolver::new(three_formats());
        resolver.write_file = false;

        let err = Service::new(&resolver)
            .download_selected(URL, &res("720p"), out.path(), OffsetDateTime::now_utc())
            .unwrap_err();

        assert!(matches!(err, Error::DownloadFailed(_)));
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
