// crates/core/src/downloader/types.rs
use thiserror::Error;

/// Errors a downloader can end a job with.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to spawn downloader: {0}")]
    SpawnFailed(String),

    #[error("Download failed: {0}")]
    Failed(String),

    #[error("Downloader not available: {0}")]
    NotAvailable(String),

    #[error("Download timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error talking to downloader: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DownloadError::Failed("series not found".into()).to_string(),
            "Download failed: series not found"
        );
        assert_eq!(
            DownloadError::Timeout(30).to_string(),
            "Download timed out after 30 seconds"
        );
    }

    #[test]
    fn test_from_io_error() {
        let err: DownloadError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, DownloadError::Io(_)));
    }
}
