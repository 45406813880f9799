//! Types for torrent-control operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during torrent-control operations.
#[derive(Debug, Error)]
pub enum TorrentControlError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(i64),

    #[error("RPC call failed: {0}")]
    RpcFailed(String),

    #[error("Unexpected RPC response: {0}")]
    Protocol(String),

    #[error("Request timeout")]
    Timeout,
}

/// State of a torrent, as reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    Stopped,
    Checking,
    Queued,
    Downloading,
    Seeding,
    Unknown,
}

impl TorrentState {
    /// Returns the string representation used in status replies.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::Stopped => "stopped",
            TorrentState::Checking => "checking",
            TorrentState::Queued => "queued",
            TorrentState::Downloading => "downloading",
            TorrentState::Seeding => "seeding",
            TorrentState::Unknown => "unknown",
        }
    }
}

/// A torrent as listed by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentSummary {
    /// Daemon-assigned torrent id.
    pub id: i64,
    /// Torrent name.
    pub name: String,
    /// Current state.
    pub state: TorrentState,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
    /// Total size in bytes.
    pub size_bytes: u64,
}

impl TorrentSummary {
    /// The selectable display string shown in choice keyboards.
    ///
    /// The leading `<id>:` prefix is what the choice parser recovers the
    /// torrent id from when the user echoes this string back.
    pub fn choice_repr(&self) -> String {
        format!("{}: {}", self.id, self.name)
    }

    /// The one-line status rendering used by the list command.
    pub fn status_repr(&self) -> String {
        format!(
            "{}: {} [{} {:.0}%]",
            self.id,
            self.name,
            self.state.as_str(),
            self.progress * 100.0
        )
    }
}

/// A single file inside a torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentFileRef {
    /// Torrent the file belongs to.
    pub torrent_id: i64,
    /// Index of the file within the torrent.
    pub file_id: usize,
    /// File path relative to the torrent root.
    pub name: String,
    /// Whether the file is currently wanted (enabled for download).
    pub wanted: bool,
}

impl TorrentFileRef {
    /// The selectable display string: `<torrentId>.<fileId>: <name>`.
    pub fn choice_repr(&self) -> String {
        format!("{}.{}: {}", self.torrent_id, self.file_id, self.name)
    }
}

/// Result of adding a torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddedTorrent {
    /// Daemon-assigned torrent id.
    pub id: i64,
    /// Torrent name, if already known (magnets may resolve it later).
    pub name: Option<String>,
    /// True when the daemon already had this torrent.
    pub duplicate: bool,
}

/// Trait for torrent-control backends.
#[async_trait]
pub trait TorrentControl: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// List all torrents currently known to the daemon.
    async fn list_torrents(&self) -> Result<Vec<TorrentSummary>, TorrentControlError>;

    /// List the files of one torrent, in daemon order.
    async fn list_torrent_files(
        &self,
        torrent_id: i64,
    ) -> Result<Vec<TorrentFileRef>, TorrentControlError>;

    /// Add a torrent by magnet URI or URL, downloading into `download_dir`.
    async fn add_torrent(
        &self,
        uri: &str,
        download_dir: &str,
    ) -> Result<AddedTorrent, TorrentControlError>;

    /// Start (resume) a torrent.
    async fn start_torrent(&self, torrent_id: i64) -> Result<(), TorrentControlError>;

    /// Stop (pause) a torrent.
    async fn stop_torrent(&self, torrent_id: i64) -> Result<(), TorrentControlError>;

    /// Remove a torrent from the daemon. Downloaded data is kept.
    async fn delete_torrent(&self, torrent_id: i64) -> Result<(), TorrentControlError>;

    /// Flip one file's wanted flag. Returns the new flag value.
    async fn toggle_torrent_file(
        &self,
        file: &TorrentFileRef,
    ) -> Result<bool, TorrentControlError>;
}
