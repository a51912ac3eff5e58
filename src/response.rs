use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    result::Error,
    service::{OutputFile, StreamListing},
    types::Catalog,
};

/// The JSON document printed on stdout for every invocation
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Success(Success),
    Error {
        error: &'static str,
        message: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Success {
    Listing {
        video_title: String,
        streams: Catalog,
        removed_files: usize,
    },
    Download {
        video_title: String,
        resolution: String,
        file_path: String,
        file_name: String,
        mime_type: String,
        #[serde(with = "time::serde::rfc3339")]
        created_at: OffsetDateTime,
        message: String,
        removed_files: usize,
    },
    Sweep {
        removed_files: usize,
    },
}

impl Response {
    pub fn listing(listing: StreamListing, removed_files: usize) -> Self {
        Response::Success(Success::Listing {
            video_title: listing.video_title,
            streams: listing.streams,
            removed_files,
        })
    }

    pub fn download(output: &OutputFile, retention_minutes: u64, removed_files: usize) -> Self {
        Response::Success(Success::Download {
            video_title: output.video_title.clone(),
            resolution: output
                .resolution()
                .map_or_else(|| "unknown".to_owned(), |r| r.to_string()),
            file_path: output.path.display().to_string(),
            file_name: output.file_name(),
            mime_type: output.stream.mime_type(),
            created_at: output.created_at,
            message: format!(
                "This file is temporarily stored and will be removed after {retention_minutes} minutes."
            ),
            removed_files,
        })
    }

    pub fn sweep(removed_files: usize) -> Self {
        Response::Success(Success::Sweep { removed_files })
    }

    pub fn error(err: &Error) -> Self {
        Response::Error {
            error: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn to_json(&self) -> String {
        // Only plain strings, numbers and sequences: serialization cannot fail
        serde_json::to_string_pretty(self).unwrap_or_else(|err| {
            format!(r#"{{"status":"error","error":"internal_error","message":"{err}"}}"#)
        })
    }
}
