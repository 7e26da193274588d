// crates/core/src/downloader/mod.rs
//! Downloader collaborator.
//!
//! The job layer only knows the [`Downloader`] trait: run one request, report
//! progress through a [`ProgressReporter`], return success or an error.
//! [`CliDownloader`] is the process-backed implementation the server ships with.

pub mod cli;
pub mod provider;
pub mod types;

pub use cli::CliDownloader;
pub use provider::{Downloader, ProgressReporter};
pub use types::DownloadError;
