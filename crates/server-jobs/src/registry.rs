// crates/server-jobs/src/registry.rs
//! Single-use handoff table between submission and execution.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use toon_dl_types::{JobId, JobRequest};

use crate::error::JobError;

/// Pending jobs keyed by id.
///
/// An entry exists from submission until the moment a session starts the job.
/// [`take`](Self::take) is the only way out, and it is atomic: of any number of
/// concurrent starts for one id, exactly one gets the request.
#[derive(Default)]
pub struct JobRegistry {
    pending: DashMap<JobId, JobRequest>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `request` under a fresh id and return the id.
    pub fn register(&self, request: JobRequest) -> JobId {
        loop {
            // Never overwrite an existing entry, however unlikely the clash.
            match self.pending.entry(JobId::generate()) {
                Entry::Vacant(slot) => {
                    let id = slot.key().clone();
                    slot.insert(request);
                    tracing::debug!(download_id = %id, "job registered");
                    return id;
                }
                Entry::Occupied(_) => continue,
            }
        }
    }

    /// Remove and return the pending request for `id`.
    pub fn take(&self, id: &JobId) -> Result<JobRequest, JobError> {
        self.pending
            .remove(id)
            .map(|(_, request)| request)
            .ok_or_else(|| JobError::UnknownOrStarted(id.clone()))
    }

    /// Number of registered jobs that have not been started.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
