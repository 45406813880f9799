//! Transmission RPC client implementation.
//!
//! Speaks the daemon's JSON-RPC dialect: every call is a POST to
//! `/transmission/rpc` with `{"method": ..., "arguments": ...}`. The daemon
//! issues a CSRF token via HTTP 409 + `X-Transmission-Session-Id`; the client
//! caches it and retries the rejected call once with the fresh token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::TransmissionConfig;

use super::{
    AddedTorrent, TorrentControl, TorrentControlError, TorrentFileRef, TorrentState,
    TorrentSummary,
};

const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// Transmission daemon client.
pub struct TransmissionClient {
    client: Client,
    config: TransmissionConfig,
    /// Cached CSRF token (refreshed on 409).
    session_id: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct RpcTorrent {
    id: i64,
    name: String,
    status: i64,
    #[serde(rename = "percentDone")]
    percent_done: f64,
    #[serde(rename = "totalSize")]
    total_size: u64,
}

#[derive(Debug, Deserialize)]
struct RpcFile {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RpcFileStat {
    wanted: bool,
}

#[derive(Debug, Deserialize)]
struct RpcAddedTorrent {
    id: i64,
    #[serde(default)]
    name: Option<String>,
}

impl TransmissionClient {
    /// Create a new client for the configured daemon.
    pub fn new(config: TransmissionConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            session_id: RwLock::new(None),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/transmission/rpc", self.config.url.trim_end_matches('/'))
    }

    async fn post_once(
        &self,
        body: &Value,
    ) -> Result<reqwest::Response, TorrentControlError> {
        let mut request = self.client.post(self.endpoint()).json(body);

        if let Some(session_id) = self.session_id.read().await.as_deref() {
            request = request.header(SESSION_ID_HEADER, session_id);
        }
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                TorrentControlError::Timeout
            } else if e.is_connect() {
                TorrentControlError::ConnectionFailed(e.to_string())
            } else {
                TorrentControlError::RpcFailed(e.to_string())
            }
        })
    }

    /// Execute one RPC call, transparently handling the 409 handshake.
    async fn call(&self, method: &str, arguments: Value) -> Result<Value, TorrentControlError> {
        let body = json!({ "method": method, "arguments": arguments });

        let mut response = self.post_once(&body).await?;

        if response.status() == StatusCode::CONFLICT {
            let token = response
                .headers()
                .get(SESSION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    TorrentControlError::Protocol("409 without session id header".to_string())
                })?;

            debug!("Transmission session id refreshed");
            *self.session_id.write().await = Some(token);

            response = self.post_once(&body).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(TorrentControlError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(TorrentControlError::RpcFailed(format!("HTTP {}", status)));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| TorrentControlError::Protocol(e.to_string()))?;

        if rpc.result != "success" {
            warn!(method, result = %rpc.result, "Transmission RPC reported failure");
            return Err(TorrentControlError::RpcFailed(rpc.result));
        }

        Ok(rpc.arguments)
    }
}

/// Map the daemon's numeric status codes to [`TorrentState`].
fn state_from_status(status: i64) -> TorrentState {
    match status {
        0 => TorrentState::Stopped,
        1 | 2 => TorrentState::Checking,
        3 | 5 => TorrentState::Queued,
        4 => TorrentState::Downloading,
        6 => TorrentState::Seeding,
        _ => TorrentState::Unknown,
    }
}

#[async_trait]
impl TorrentControl for TransmissionClient {
    fn name(&self) -> &str {
        "transmission"
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentSummary>, TorrentControlError> {
        let arguments = self
            .call(
                "torrent-get",
                json!({ "fields": ["id", "name", "status", "percentDone", "totalSize"] }),
            )
            .await?;

        let torrents: Vec<RpcTorrent> =
            serde_json::from_value(arguments.get("torrents").cloned().unwrap_or(Value::Null))
                .map_err(|e| TorrentControlError::Protocol(e.to_string()))?;

        Ok(torrents
            .into_iter()
            .map(|t| TorrentSummary {
                id: t.id,
                name: t.name,
                state: state_from_status(t.status),
                progress: t.percent_done,
                size_bytes: t.total_size,
            })
            .collect())
    }

    async fn list_torrent_files(
        &self,
        torrent_id: i64,
    ) -> Result<Vec<TorrentFileRef>, TorrentControlError> {
        let arguments = self
            .call(
                "torrent-get",
                json!({ "ids": [torrent_id], "fields": ["id", "files", "fileStats"] }),
            )
            .await?;

        #[derive(Debug, Deserialize)]
        struct RpcTorrentFiles {
            #[serde(default)]
            files: Vec<RpcFile>,
            #[serde(rename = "fileStats", default)]
            file_stats: Vec<RpcFileStat>,
        }

        let mut torrents: Vec<RpcTorrentFiles> =
            serde_json::from_value(arguments.get("torrents").cloned().unwrap_or(Value::Null))
                .map_err(|e| TorrentControlError::Protocol(e.to_string()))?;

        let torrent = torrents
            .pop()
            .ok_or(TorrentControlError::TorrentNotFound(torrent_id))?;

        Ok(torrent
            .files
            .into_iter()
            .enumerate()
            .map(|(file_id, file)| {
                let wanted = torrent
                    .file_stats
                    .get(file_id)
                    .map(|s| s.wanted)
                    .unwrap_or(true);
                TorrentFileRef {
                    torrent_id,
                    file_id,
                    name: file.name,
                    wanted,
                }
            })
            .collect())
    }

    async fn add_torrent(
        &self,
        uri: &str,
        download_dir: &str,
    ) -> Result<AddedTorrent, TorrentControlError> {
        let arguments = self
            .call(
                "torrent-add",
                json!({ "filename": uri, "download-dir": download_dir }),
            )
            .await?;

        if let Some(added) = arguments.get("torrent-added") {
            let added: RpcAddedTorrent = serde_json::from_value(added.clone())
                .map_err(|e| TorrentControlError::Protocol(e.to_string()))?;
            return Ok(AddedTorrent {
                id: added.id,
                name: added.name,
                duplicate: false,
            });
        }

        if let Some(duplicate) = arguments.get("torrent-duplicate") {
            let duplicate: RpcAddedTorrent = serde_json::from_value(duplicate.clone())
                .map_err(|e| TorrentControlError::Protocol(e.to_string()))?;
            return Ok(AddedTorrent {
                id: duplicate.id,
                name: duplicate.name,
                duplicate: true,
            });
        }

        Err(TorrentControlError::Protocol(
            "torrent-add returned neither torrent-added nor torrent-duplicate".to_string(),
        ))
    }

    async fn start_torrent(&self, torrent_id: i64) -> Result<(), TorrentControlError> {
        self.call("torrent-start", json!({ "ids": [torrent_id] }))
            .await?;
        Ok(())
    }

    async fn stop_torrent(&self, torrent_id: i64) -> Result<(), TorrentControlError> {
        self.call("torrent-stop", json!({ "ids": [torrent_id] }))
            .await?;
        Ok(())
    }

    async fn delete_torrent(&self, torrent_id: i64) -> Result<(), TorrentControlError> {
        self.call(
            "torrent-remove",
            json!({ "ids": [torrent_id], "delete-local-data": false }),
        )
        .await?;
        Ok(())
    }

    async fn toggle_torrent_file(
        &self,
        file: &TorrentFileRef,
    ) -> Result<bool, TorrentControlError> {
        let key = if file.wanted {
            "files-unwanted"
        } else {
            "files-wanted"
        };

        self.call(
            "torrent-set",
            json!({ "ids": [file.torrent_id], key: [file.file_id] }),
        )
        .await?;

        Ok(!file.wanted)
    }
}
