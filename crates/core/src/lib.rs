// crates/core/src/lib.rs
pub mod downloader;

pub use downloader::{CliDownloader, DownloadError, Downloader, ProgressReporter};
