// crates/server-jobs/src/error.rs
use thiserror::Error;
use toon_dl_types::{DecodeError, ErrorNotice, JobId};

/// Errors from the job registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// Never registered, registered elsewhere, or already taken by a start.
    /// The registry keeps no history, so these cases look the same.
    #[error("Invalid download_id: {0} is unknown or already started")]
    UnknownOrStarted(JobId),
}

/// Why a single inbound message was rejected. The session keeps running.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Malformed(#[from] DecodeError),

    #[error(transparent)]
    Job(#[from] JobError),
}

impl SessionError {
    /// Metric label for the rejection.
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::Malformed(_) => "malformed",
            SessionError::Job(JobError::UnknownOrStarted(_)) => "unknown_job",
        }
    }

    /// Client-facing notification. Only job errors carry a `download_id`.
    pub fn into_notice(self) -> ErrorNotice {
        match self {
            SessionError::Malformed(e) => ErrorNotice::malformed(e.to_string()),
            SessionError::Job(e) => {
                let message = e.to_string();
                match e {
                    JobError::UnknownOrStarted(id) => ErrorNotice::for_job(id, message),
                }
            }
        }
    }
}
