use serde::{Deserialize, Deserializer};

/// What the resolver knows about a video
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// One format record as given by the resolver, before normalization.
///
/// Field names follow the `yt-dlp` JSON output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    #[serde(default)]
    pub format_id: String,
    #[serde(default, deserialize_with = "codec")]
    pub vcodec: Option<String>,
    #[serde(default, deserialize_with = "codec")]
    pub acodec: Option<String>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub ext: Option<String>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub url: String,
}

/// `yt-dlp` writes `"none"` for a missing codec, map it to an absent one
fn codec<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|c| !c.is_empty() && c != "none"))
}
