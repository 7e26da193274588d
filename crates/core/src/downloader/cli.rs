// crates/core/src/downloader/cli.rs
//! Process-backed downloader: spawns an external downloader binary and turns
//! its JSON-lines stdout into progress updates.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use toon_dl_types::{JobRequest, ProgressFields};

use super::provider::{Downloader, ProgressReporter};
use super::types::DownloadError;

/// Number of trailing stderr lines kept for the failure message.
const STDERR_TAIL_LINES: usize = 20;

/// Timeout for the `--version` probe.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Downloader that runs an external program once per job.
///
/// Invocation: `{program} {extra_args..} <url> [--start N] [--end N] [--latest]
/// [--dest DIR] --images-format FMT [--separate]`.
///
/// Each stdout line holding a JSON object is one progress update; any other
/// line is logged and ignored. A non-zero exit fails the job with the tail of
/// stderr as the message. The child is killed if the job future is dropped.
pub struct CliDownloader {
    program: PathBuf,
    extra_args: Vec<String>,
    timeout_secs: Option<u64>,
}

impl CliDownloader {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            timeout_secs: None,
        }
    }

    /// Arguments placed before the per-job arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Fail a job that runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Per-job arguments derived from the request.
    pub fn job_args(request: &JobRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![request.url.clone().into()];
        if let Some(start) = request.start_chapter {
            args.push("--start".into());
            args.push(start.to_string().into());
        }
        if let Some(end) = request.end_chapter {
            args.push("--end".into());
            args.push(end.to_string().into());
        }
        if request.download_latest_chapter {
            args.push("--latest".into());
        }
        if let Some(dest) = &request.dest {
            args.push("--dest".into());
            args.push(dest.clone().into_os_string());
        }
        args.push("--images-format".into());
        args.push(request.images_format.as_str().into());
        if request.separate_chapters {
            args.push("--separate".into());
        }
        args
    }

    async fn run(
        &self,
        request: &JobRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<(), DownloadError> {
        tracing::info!(
            program = %self.program.display(),
            url = %request.url,
            "downloader: spawning"
        );

        let mut child = Command::new(&self.program)
            .args(&self.extra_args)
            .args(Self::job_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!(error = %e, program = %self.program.display(), "downloader: failed to spawn");
                DownloadError::SpawnFailed(e.to_string())
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::SpawnFailed("failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::SpawnFailed("failed to capture stderr".to_string()))?;

        // Drain both pipes together so a chatty stderr can't stall stdout.
        let (forwarded, stderr_tail) =
            tokio::join!(forward_progress(stdout, progress), stderr_tail(stderr));
        forwarded?;

        let status = child.wait().await?;
        if status.success() {
            tracing::info!(url = %request.url, "downloader: finished");
            Ok(())
        } else {
            tracing::warn!(exit_code = ?status.code(), url = %request.url, "downloader: non-zero exit");
            Err(DownloadError::Failed(failure_message(status, &stderr_tail)))
        }
    }
}

#[async_trait]
impl Downloader for CliDownloader {
    async fn download(
        &self,
        request: &JobRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<(), DownloadError> {
        match self.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), self.run(request, progress))
                .await
                .map_err(|_| {
                    tracing::error!(timeout_secs = secs, url = %request.url, "downloader: timed out");
                    DownloadError::Timeout(secs)
                })?,
            None => self.run(request, progress).await,
        }
    }

    async fn health_check(&self) -> Result<(), DownloadError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--version").stdin(Stdio::null()).kill_on_drop(true);

        let output = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, cmd.output())
            .await
            .map_err(|_| DownloadError::Timeout(HEALTH_CHECK_TIMEOUT.as_secs()))?
            .map_err(|e| {
                DownloadError::NotAvailable(format!("{} not found: {e}", self.program.display()))
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(DownloadError::NotAvailable(format!(
                "{} --version failed",
                self.program.display()
            )))
        }
    }

    fn name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("downloader")
    }
}

/// Parse one stdout line into progress fields, if it is a JSON object.
pub fn parse_progress_line(line: &str) -> Option<ProgressFields> {
    match serde_json::from_str::<serde_json::Value>(line.trim()) {
        Ok(serde_json::Value::Object(fields)) => Some(fields),
        _ => None,
    }
}

/// Read one `\n`-terminated line, decoding invalid UTF-8 lossily.
/// `Ok(None)` at EOF.
async fn next_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf[..]);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

async fn forward_progress<R>(stdout: R, progress: &dyn ProgressReporter) -> Result<(), DownloadError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    while let Some(line) = next_line_lossy(&mut reader, &mut buf).await? {
        match parse_progress_line(&line) {
            Some(fields) => progress.report(fields).await,
            None if line.trim().is_empty() => {}
            None => tracing::debug!(line = %line, "downloader: non-progress output"),
        }
    }
    Ok(())
}

/// Drain stderr to EOF, keeping the last lines. The pipe stays open until the
/// child closes it so the child never writes into a closed pipe.
async fn stderr_tail<R>(stderr: R) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        match next_line_lossy(&mut reader, &mut buf).await {
            Ok(Some(line)) => {
                tracing::debug!(line = %line, "downloader: stderr");
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "downloader: stderr read failed");
                break;
            }
        }
    }
    tail.into()
}

fn failure_message(status: ExitStatus, stderr_tail: &[String]) -> String {
    let detail = stderr_tail
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if detail.is_empty() {
        format!("downloader exited with {status}")
    } else {
        detail
    }
}
