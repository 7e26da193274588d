// crates/types/src/lib.rs
//! Shared data model for toon-dl.
//!
//! - [`JobRequest`] / [`JobId`]: what a client submits and the handle it gets back
//! - [`ProgressEvent`]: one update in a job's event stream
//! - [`ClientMessage`] / [`ServerMessage`]: the WebSocket control protocol

pub mod event;
pub mod job;
pub mod wire;

pub use event::{EventKind, ProgressEvent, ProgressFields};
pub use job::{ImageFormat, JobId, JobRequest, SubmitResponse};
pub use wire::{ClientMessage, DecodeError, ErrorNotice, ServerMessage};
