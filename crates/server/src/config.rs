// crates/server/src/config.rs
//! Command-line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use toon_dl_observability::{LogConfig, LogFormat};

/// Port used when neither `--port`, `TOON_DL_PORT` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Parser, Debug, Clone)]
#[command(name = "toon-dl", version, about = "Webtoon download job server")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0", env = "TOON_DL_HOST")]
    pub host: IpAddr,

    /// Port to listen on. Falls back to `PORT`, then 8000.
    #[arg(long, env = "TOON_DL_PORT")]
    pub port: Option<u16>,

    /// Downloader program run once per started job.
    #[arg(long, default_value = "webtoon-downloader", env = "TOON_DL_DOWNLOADER")]
    pub downloader: PathBuf,

    /// Extra argument appended to every downloader invocation. Repeat for more.
    #[arg(long = "downloader-arg", allow_hyphen_values = true)]
    pub downloader_args: Vec<String>,

    /// Kill a download that runs longer than this.
    #[arg(long, env = "TOON_DL_DOWNLOADER_TIMEOUT_SECS")]
    pub downloader_timeout_secs: Option<u64>,

    /// Outbound events buffered per connection before jobs wait for the socket.
    #[arg(long, default_value_t = 256, env = "TOON_DL_OUTBOUND_BUFFER", value_parser = clap::value_parser!(u32).range(1..))]
    pub outbound_buffer: u32,

    /// Cancel a connection's running jobs when it closes.
    #[arg(long, default_value_t = false, env = "TOON_DL_CANCEL_ON_DISCONNECT")]
    pub cancel_on_disconnect: bool,

    /// Stderr log format: compact or json.
    #[arg(long, default_value = "compact", env = "TOON_DL_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Also write daily rolling JSON logs here.
    #[arg(long, env = "TOON_DL_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Resolve the listen port: flag or `TOON_DL_PORT`, then `PORT`, then the default.
    pub fn port(&self) -> u16 {
        self.port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port())
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            format: self.log_format,
            log_dir: self.log_dir.clone(),
        }
    }

    pub fn outbound_buffer(&self) -> usize {
        self.outbound_buffer as usize
    }
}
