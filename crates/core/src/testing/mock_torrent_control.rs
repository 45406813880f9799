//! Mock torrent-control backend for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::magnet;
use crate::transmission::{
    AddedTorrent, TorrentControl, TorrentControlError, TorrentFileRef, TorrentState,
    TorrentSummary,
};

/// A recorded backend call, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    ListTorrents,
    ListFiles(i64),
    Add { uri: String, dir: String },
    Start(i64),
    Stop(i64),
    Delete(i64),
    Toggle { torrent_id: i64, file_id: usize },
}

/// Mock implementation of the `TorrentControl` trait.
///
/// Keeps an in-memory torrent inventory, records every call, and can be
/// primed to fail the next operation.
#[derive(Default)]
pub struct MockTorrentControl {
    torrents: Arc<RwLock<Vec<TorrentSummary>>>,
    files: Arc<RwLock<HashMap<i64, Vec<TorrentFileRef>>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    next_error: Arc<RwLock<Option<TorrentControlError>>>,
    next_id: Arc<RwLock<i64>>,
}

impl MockTorrentControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a torrent into the inventory.
    pub async fn push_torrent(&self, id: i64, name: &str) {
        self.torrents.write().await.push(TorrentSummary {
            id,
            name: name.to_string(),
            state: TorrentState::Downloading,
            progress: 0.0,
            size_bytes: 0,
        });
    }

    /// Seed the file list of a torrent as (name, wanted) pairs.
    pub async fn set_files(&self, torrent_id: i64, files: &[(&str, bool)]) {
        let refs = files
            .iter()
            .enumerate()
            .map(|(file_id, (name, wanted))| TorrentFileRef {
                torrent_id,
                file_id,
                name: name.to_string(),
                wanted: *wanted,
            })
            .collect();
        self.files.write().await.insert(torrent_id, refs);
    }

    /// All calls made so far, in order.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Fail the next operation with `error`.
    pub async fn fail_next(&self, error: TorrentControlError) {
        *self.next_error.write().await = Some(error);
    }

    async fn record(&self, call: RecordedCall) -> Result<(), TorrentControlError> {
        self.calls.write().await.push(call);
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TorrentControl for MockTorrentControl {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentSummary>, TorrentControlError> {
        self.record(RecordedCall::ListTorrents).await?;
        Ok(self.torrents.read().await.clone())
    }

    async fn list_torrent_files(
        &self,
        torrent_id: i64,
    ) -> Result<Vec<TorrentFileRef>, TorrentControlError> {
        self.record(RecordedCall::ListFiles(torrent_id)).await?;

        if let Some(files) = self.files.read().await.get(&torrent_id) {
            return Ok(files.clone());
        }
        if self.torrents.read().await.iter().any(|t| t.id == torrent_id) {
            return Ok(Vec::new());
        }
        Err(TorrentControlError::TorrentNotFound(torrent_id))
    }

    async fn add_torrent(
        &self,
        uri: &str,
        download_dir: &str,
    ) -> Result<AddedTorrent, TorrentControlError> {
        self.record(RecordedCall::Add {
            uri: uri.to_string(),
            dir: download_dir.to_string(),
        })
        .await?;

        let mut next_id = self.next_id.write().await;
        *next_id += 1;
        let id = *next_id;

        let name = magnet::display_name(uri);
        self.torrents.write().await.push(TorrentSummary {
            id,
            name: name.clone(),
            state: TorrentState::Downloading,
            progress: 0.0,
            size_bytes: 0,
        });

        Ok(AddedTorrent {
            id,
            name: Some(name),
            duplicate: false,
        })
    }

    async fn start_torrent(&self, torrent_id: i64) -> Result<(), TorrentControlError> {
        self.record(RecordedCall::Start(torrent_id)).await?;
        let mut torrents = self.torrents.write().await;
        if let Some(torrent) = torrents.iter_mut().find(|t| t.id == torrent_id) {
            torrent.state = TorrentState::Downloading;
        }
        Ok(())
    }

    async fn stop_torrent(&self, torrent_id: i64) -> Result<(), TorrentControlError> {
        self.record(RecordedCall::Stop(torrent_id)).await?;
        let mut torrents = self.torrents.write().await;
        if let Some(torrent) = torrents.iter_mut().find(|t| t.id == torrent_id) {
            torrent.state = TorrentState::Stopped;
        }
        Ok(())
    }

    async fn delete_torrent(&self, torrent_id: i64) -> Result<(), TorrentControlError> {
        self.record(RecordedCall::Delete(torrent_id)).await?;
        self.torrents.write().await.retain(|t| t.id != torrent_id);
        self.files.write().await.remove(&torrent_id);
        Ok(())
    }

    async fn toggle_torrent_file(
        &self,
        file: &TorrentFileRef,
    ) -> Result<bool, TorrentControlError> {
        self.record(RecordedCall::Toggle {
            torrent_id: file.torrent_id,
            file_id: file.file_id,
        })
        .await?;

        let mut files = self.files.write().await;
        let stored = files
            .get_mut(&file.torrent_id)
            .and_then(|fs| fs.iter_mut().find(|f| f.file_id == file.file_id));

        match stored {
            Some(stored) => {
                stored.wanted = !stored.wanted;
                Ok(stored.wanted)
            }
            None => Err(TorrentControlError::TorrentNotFound(file.torrent_id)),
        }
    }
}
