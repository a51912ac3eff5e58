use std::ops::Deref;

use serde::Serialize;

use super::Resolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamKind {
    /// Video and audio in a single file, also called progressive
    #[serde(rename = "video+audio")]
    Combined,
    #[serde(rename = "video-only")]
    VideoOnly,
    #[serde(rename = "audio-only")]
    AudioOnly,
    #[serde(rename = "unknown")]
    Unknown,
}

impl StreamKind {
    /// Derive the kind from which codecs are present
    pub fn from_codecs(video_codec: Option<&str>, audio_codec: Option<&str>) -> Self {
        match (video_codec, audio_codec) {
            (Some(_), Some(_)) => StreamKind::Combined,
            (Some(_), None) => StreamKind::VideoOnly,
            (None, Some(_)) => StreamKind::AudioOnly,
            (None, None) => StreamKind::Unknown,
        }
    }

    /// Position of the kind in a catalog, lower comes first
    pub fn priority(self) -> u8 {
        match self {
            StreamKind::Combined => 0,
            StreamKind::AudioOnly => 1,
            StreamKind::VideoOnly => 2,
            StreamKind::Unknown => 3,
        }
    }
}

/// One encoding of a video, as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamDescriptor {
    pub kind: StreamKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    pub container: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approx_size_mb: Option<f64>,
    pub source_url: String,
    pub format_id: String,
}

impl StreamDescriptor {
    /// Numeric resolution used for sorting, 0 when there is none
    pub fn sort_height(&self) -> u32 {
        self.resolution.map_or(0, Resolution::height)
    }

    /// MIME type of the file this stream produces
    pub fn mime_type(&self) -> String {
        let subtype = match self.container.as_str() {
            "m4a" => "mp4",
            "mkv" => "x-matroska",
            other => other,
        };

        match self.kind {
            StreamKind::AudioOnly => format!("audio/{subtype}"),
            _ => format!("video/{subtype}"),
        }
    }
}

/// Sorted list of the usable streams of a video.
/// Built fresh for every request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Catalog(Vec<StreamDescriptor>);

impl Catalog {
    pub fn new(data: Vec<StreamDescriptor>) -> Self {
        Self(data)
    }

    /// Iterate over the combined (video+audio) entries, in catalog order
    pub fn combined(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.0.iter().filter(|s| s.kind == StreamKind::Combined)
    }
}

impl Deref for Catalog {
    type Target = Vec<StreamDescriptor>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
