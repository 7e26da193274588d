// crates/types/src/wire.rs
//! WebSocket control protocol.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::ProgressEvent;
use crate::job::JobId;

/// Inbound control message.
///
/// `{"action": "start_download", "download_id": "<id>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    StartDownload { download_id: JobId },
}

/// Why an inbound frame could not be turned into a [`ClientMessage`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid message: binary frame is not valid UTF-8")]
    NotUtf8,
}

impl ClientMessage {
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Binary frames are accepted when they carry UTF-8 JSON.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::NotUtf8)?;
        Self::decode(text)
    }
}

/// Error notification that is not part of a running job's stream.
///
/// Without `download_id` it reports a malformed message; with one it reports
/// a start request for a job that is unknown or already started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_id: Option<JobId>,
    pub error: String,
}

impl ErrorNotice {
    pub fn malformed(error: impl Into<String>) -> Self {
        Self {
            download_id: None,
            error: error.into(),
        }
    }

    pub fn for_job(download_id: JobId, error: impl Into<String>) -> Self {
        Self {
            download_id: Some(download_id),
            error: error.into(),
        }
    }
}

/// Everything the server writes to a connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Event(ProgressEvent),
    Notice(ErrorNotice),
}

impl ServerMessage {
    pub fn download_id(&self) -> Option<&JobId> {
        match self {
            ServerMessage::Event(event) => Some(&event.download_id),
            ServerMessage::Notice(notice) => notice.download_id.as_ref(),
        }
    }
}

impl From<ProgressEvent> for ServerMessage {
    fn from(event: ProgressEvent) -> Self {
        ServerMessage::Event(event)
    }
}

impl From<ErrorNotice> for ServerMessage {
    fn from(notice: ErrorNotice) -> Self {
        ServerMessage::Notice(notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_start_download() {
        let msg = ClientMessage::decode(r#"{"action":"start_download","download_id":"abc"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::StartDownload {
                download_id: JobId::from("abc")
            }
        );
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let msg = ClientMessage::decode(
            r#"{"action":"start_download","download_id":"abc","client":"web"}"#,
        );
        assert!(msg.is_ok());
    }

    #[test]
    fn test_decode_rejects_unknown_action() {
        let err = ClientMessage::decode(r#"{"action":"pause","download_id":"abc"}"#).unwrap_err();
        assert!(err.to_string().contains("pause"));
    }

    #[test]
    fn test_decode_rejects_missing_id() {
        let err = ClientMessage::decode(r#"{"action":"start_download"}"#).unwrap_err();
        assert!(err.to_string().contains("download_id"));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(matches!(
            ClientMessage::decode("not json at all"),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_bytes_rejects_invalid_utf8() {
        assert!(matches!(
            ClientMessage::decode_bytes(&[0xff, 0xfe, 0x00]),
            Err(DecodeError::NotUtf8)
        ));
    }

    #[test]
    fn test_notice_shapes() {
        let malformed = ServerMessage::from(ErrorNotice::malformed("bad"));
        assert_eq!(serde_json::to_value(&malformed).unwrap(), json!({"error": "bad"}));
        assert_eq!(malformed.download_id(), None);

        let unknown = ServerMessage::from(ErrorNotice::for_job(JobId::from("x"), "Invalid download_id"));
        assert_eq!(
            serde_json::to_value(&unknown).unwrap(),
            json!({"download_id": "x", "error": "Invalid download_id"})
        );
    }

    #[test]
    fn test_event_message_serializes_as_event() {
        let msg = ServerMessage::from(ProgressEvent::completed(JobId::from("x")));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"download_id": "x", "status": "completed"})
        );
        assert_eq!(msg.download_id(), Some(&JobId::from("x")));
    }
}
