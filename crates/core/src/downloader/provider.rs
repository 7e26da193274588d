// crates/core/src/downloader/provider.rs
//! Traits at the seam between the job layer and the downloader.

use async_trait::async_trait;
use toon_dl_types::{JobRequest, ProgressFields};

use super::types::DownloadError;

/// Receives progress updates while a download runs.
///
/// `report` may suspend when the consumer is backpressured. Implementations
/// swallow delivery failures; a download is never aborted because nobody is
/// listening any more.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, update: ProgressFields);
}

/// Something that can carry out a [`JobRequest`].
///
/// Implementations include:
/// - `CliDownloader`: spawns an external downloader process
/// - scripted fakes in tests
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Run the request to completion, reporting zero or more updates.
    ///
    /// The reporter is only borrowed for the duration of the call, so no
    /// update can arrive after this returns.
    async fn download(
        &self,
        request: &JobRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<(), DownloadError>;

    /// Check that the downloader can run at all (binary installed, etc.)
    async fn health_check(&self) -> Result<(), DownloadError> {
        Ok(())
    }

    /// Name for logging/display (e.g. "webtoon-downloader").
    fn name(&self) -> &str;
}
