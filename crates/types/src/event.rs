// crates/types/src/event.rs
//! Progress events streamed back to clients.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::job::JobId;

/// Downloader-supplied progress fields (chapter counters, fractions, ...).
pub type ProgressFields = serde_json::Map<String, serde_json::Value>;

/// Keys owned by the envelope. Downloader fields with these names are dropped
/// so they can never spoof another job's id or fake a terminal status.
const RESERVED_KEYS: [&str; 3] = ["download_id", "status", "error"];

/// What a single event says about its job.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Progress(ProgressFields),
    Completed,
    Error(String),
}

/// One update in a job's event stream.
///
/// Serializes flat:
/// - `{"download_id", "status":"progress", ...fields}`
/// - `{"download_id", "status":"completed"}`
/// - `{"download_id", "status":"error", "error": msg}`
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub download_id: JobId,
    pub kind: EventKind,
}

impl ProgressEvent {
    pub fn progress(download_id: JobId, fields: ProgressFields) -> Self {
        Self {
            download_id,
            kind: EventKind::Progress(fields),
        }
    }

    pub fn completed(download_id: JobId) -> Self {
        Self {
            download_id,
            kind: EventKind::Completed,
        }
    }

    pub fn error(download_id: JobId, message: impl Into<String>) -> Self {
        Self {
            download_id,
            kind: EventKind::Error(message.into()),
        }
    }

    /// Status tag as it appears on the wire.
    pub fn status(&self) -> &'static str {
        match self.kind {
            EventKind::Progress(_) => "progress",
            EventKind::Completed => "completed",
            EventKind::Error(_) => "error",
        }
    }

    /// `completed` and `error` end a job's stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, EventKind::Progress(_))
    }
}

impl Serialize for ProgressEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("download_id", &self.download_id)?;
        map.serialize_entry("status", self.status())?;
        match &self.kind {
            EventKind::Progress(fields) => {
                for (key, value) in fields {
                    if !RESERVED_KEYS.contains(&key.as_str()) {
                        map.serialize_entry(key, value)?;
                    }
                }
            }
            EventKind::Completed => {}
            EventKind::Error(message) => map.serialize_entry("error", message)?,
        }
        map.end()
    }
}
