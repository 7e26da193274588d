// crates/types/src/job.rs
//! Job submission types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
#[cfg(feature = "codegen")]
use ts_rs::TS;
use uuid::Uuid;

/// Opaque job identity handed out at submission time.
///
/// Freshly generated ids are random UUIDv4 strings. Anything a client sends
/// back is accepted as an id so that lookups of bogus values simply miss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "codegen", derive(TS), ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Allocate a new random identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Image encoding the downloader writes pages in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "codegen", derive(TS), ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
    Webp,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested download, as submitted by a client.
///
/// Nothing in this crate or the job layer mutates a request after it has been
/// deserialized. When `download_latest_chapter` is set the chapter bounds are
/// still carried through untouched; the downloader decides to ignore them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "codegen", derive(TS), ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct JobRequest {
    /// Series URL to download from.
    pub url: String,
    #[serde(default)]
    pub start_chapter: Option<u32>,
    #[serde(default)]
    pub end_chapter: Option<u32>,
    /// Destination directory. `None` lets the downloader pick its default.
    #[serde(default)]
    #[cfg_attr(feature = "codegen", ts(type = "string | null"))]
    pub dest: Option<PathBuf>,
    #[serde(default)]
    pub images_format: ImageFormat,
    #[serde(default)]
    pub download_latest_chapter: bool,
    #[serde(default = "default_separate_chapters")]
    pub separate_chapters: bool,
}

fn default_separate_chapters() -> bool {
    true
}

impl JobRequest {
    /// A request for `url` with every other field at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            start_chapter: None,
            end_chapter: None,
            dest: None,
            images_format: ImageFormat::default(),
            download_latest_chapter: false,
            separate_chapters: default_separate_chapters(),
        }
    }
}

/// Response body of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "codegen", derive(TS), ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct SubmitResponse {
    pub download_id: JobId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generated_ids_are_unique_uuids() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_job_id_serializes_as_plain_string() {
        let id = JobId::from("abc-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
        let back: JobId = serde_json::from_str("\"abc-123\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_request_defaults_match_minimal_body() {
        let req: JobRequest = serde_json::from_str(r#"{"url":"X"}"#).unwrap();
        assert_eq!(req, JobRequest::new("X"));
        assert_eq!(req.images_format, ImageFormat::Jpg);
        assert!(req.separate_chapters);
        assert!(!req.download_latest_chapter);
        assert!(req.dest.is_none());
    }

    #[test]
    fn test_request_accepts_explicit_nulls() {
        let req: JobRequest = serde_json::from_str(
            r#"{"url":"X","start_chapter":null,"end_chapter":null,"dest":"D","images_format":"png"}"#,
        )
        .unwrap();
        assert_eq!(req.start_chapter, None);
        assert_eq!(req.dest, Some(PathBuf::from("D")));
        assert_eq!(req.images_format, ImageFormat::Png);
    }

    #[test]
    fn test_latest_flag_keeps_chapter_bounds() {
        let req: JobRequest = serde_json::from_str(
            r#"{"url":"X","start_chapter":3,"end_chapter":9,"download_latest_chapter":true}"#,
        )
        .unwrap();
        assert!(req.download_latest_chapter);
        assert_eq!(req.start_chapter, Some(3));
        assert_eq!(req.end_chapter, Some(9));
    }

    #[test]
    fn test_unknown_image_format_rejected() {
        let err = serde_json::from_str::<JobRequest>(r#"{"url":"X","images_format":"gif"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_submit_response_shape() {
        let resp = SubmitResponse {
            download_id: JobId::from("id-1"),
        };
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            serde_json::json!({"download_id": "id-1"})
        );
    }
}
