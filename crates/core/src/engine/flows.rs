//! Flow stage handlers.
//!
//! Each command flow is one or two stages built around a domain callback.
//! Stages are composed with [`Cancelable`], so a literal "cancel" (any
//! case, surrounding whitespace) escapes any flow from any depth.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::chat::Keyboard;
use crate::config::BackendErrorPolicy;
use crate::magnet;
use crate::transmission::{TorrentControl, TorrentControlError, TorrentFileRef, TorrentSummary};

use super::menu::Menu;
use super::parse;
use super::states::StateId;
use super::types::{EngineError, FileAction, MagnetAction, StageHandler, TorrentAction, Turn};

/// Apply the configured backend-failure policy.
pub(super) fn backend_failure(
    policy: BackendErrorPolicy,
    menu: &Menu,
    turn: &mut Turn<'_>,
    name: &str,
    err: EngineError,
) -> Result<StateId, EngineError> {
    match policy {
        BackendErrorPolicy::Report => {
            warn!(command = %name, error = %err, "backend call failed");
            turn.reply(format!("{} failed: {}", name, err));
            Ok(menu.present(turn))
        }
        BackendErrorPolicy::Fail => Err(err),
    }
}

/// Cancellation middleware.
///
/// Wraps every flow stage (and only flow stages): trimmed, case-folded
/// input equal to "cancel" short-circuits straight to the main menu.
pub struct Cancelable<H> {
    inner: H,
    menu: Arc<Menu>,
}

impl<H> Cancelable<H> {
    pub fn new(inner: H, menu: Arc<Menu>) -> Self {
        Self { inner, menu }
    }
}

#[async_trait]
impl<H: StageHandler> StageHandler for Cancelable<H> {
    async fn handle(&self, turn: &mut Turn<'_>) -> Result<StateId, EngineError> {
        if turn.text.trim().eq_ignore_ascii_case("cancel") {
            return Ok(self.menu.present(turn));
        }

        self.inner.handle(turn).await
    }
}

fn prompt_magnet(turn: &mut Turn<'_>) {
    turn.reply("Enter magnet url (or type 'cancel'):");
}

fn prompt_torrent_choice(turn: &mut Turn<'_>, torrents: &[TorrentSummary]) {
    let mut rows = vec![vec!["Cancel".to_string()]];
    rows.extend(torrents.iter().map(|t| vec![t.choice_repr()]));
    turn.reply_with_keyboard("Choose torrent:", Keyboard::Buttons(rows));
}

fn prompt_file_choice(turn: &mut Turn<'_>, files: &[TorrentFileRef]) {
    let mut rows = vec![vec!["Cancel".to_string()]];
    rows.extend(files.iter().map(|f| vec![f.choice_repr()]));
    turn.reply_with_keyboard("Choose file:", Keyboard::Buttons(rows));
}

/// Single-state flow expecting a magnet URI.
///
/// Anything that does not start with `magnet:` (case-insensitively)
/// re-prompts the same state; a match invokes the callback and reports
/// `<name>('<display name>') = <result>`.
pub struct MagnetFlowHandler {
    name: String,
    state: StateId,
    action: MagnetAction,
    menu: Arc<Menu>,
    policy: BackendErrorPolicy,
}

impl MagnetFlowHandler {
    pub fn new(
        name: String,
        state: StateId,
        action: MagnetAction,
        menu: Arc<Menu>,
        policy: BackendErrorPolicy,
    ) -> Self {
        Self {
            name,
            state,
            action,
            menu,
            policy,
        }
    }
}

#[async_trait]
impl StageHandler for MagnetFlowHandler {
    async fn handle(&self, turn: &mut Turn<'_>) -> Result<StateId, EngineError> {
        let text = turn.text.trim();

        if !text.to_lowercase().starts_with("magnet:") {
            prompt_magnet(turn);
            return Ok(self.state);
        }

        let display_name = magnet::display_name(text);

        match (self.action)(text.to_string()).await {
            Ok(reply) => {
                for line in reply.into_lines() {
                    turn.reply(format!("{}('{}') = {}", self.name, display_name, line));
                }
                Ok(self.menu.present(turn))
            }
            Err(e) => backend_failure(self.policy, &self.menu, turn, &self.name, e),
        }
    }
}

/// Single-state flow selecting one torrent.
///
/// Lists the daemon's current torrents as selectable display strings; an
/// echoed string resolves to its id and the callback runs. Anything else
/// re-renders the list.
pub struct TorrentFlowHandler {
    name: String,
    state: StateId,
    action: TorrentAction,
    control: Arc<dyn TorrentControl>,
    menu: Arc<Menu>,
    policy: BackendErrorPolicy,
}

impl TorrentFlowHandler {
    pub fn new(
        name: String,
        state: StateId,
        action: TorrentAction,
        control: Arc<dyn TorrentControl>,
        menu: Arc<Menu>,
        policy: BackendErrorPolicy,
    ) -> Self {
        Self {
            name,
            state,
            action,
            control,
            menu,
            policy,
        }
    }
}

#[async_trait]
impl StageHandler for TorrentFlowHandler {
    async fn handle(&self, turn: &mut Turn<'_>) -> Result<StateId, EngineError> {
        let torrents = match self.control.list_torrents().await {
            Ok(torrents) => torrents,
            Err(e) => {
                return backend_failure(self.policy, &self.menu, turn, &self.name, e.into())
            }
        };

        let displayed: Vec<String> = torrents.iter().map(TorrentSummary::choice_repr).collect();
        let Some(torrent_id) = parse::torrent_id(turn.text, &displayed) else {
            prompt_torrent_choice(turn, &torrents);
            return Ok(self.state);
        };

        match (self.action)(torrent_id).await {
            Ok(reply) => {
                for line in reply.into_lines() {
                    turn.reply(format!("{}({}) = {}", self.name, torrent_id, line));
                }
                Ok(self.menu.present(turn))
            }
            Err(e) => backend_failure(self.policy, &self.menu, turn, &self.name, e),
        }
    }
}

/// Stage 1 of the torrent-file flow: select a torrent, then list its files
/// (sorted by name) and move on to the file-choice state.
pub struct PickTorrentHandler {
    name: String,
    state: StateId,
    next: StateId,
    control: Arc<dyn TorrentControl>,
    menu: Arc<Menu>,
    policy: BackendErrorPolicy,
}

impl PickTorrentHandler {
    pub fn new(
        name: String,
        state: StateId,
        next: StateId,
        control: Arc<dyn TorrentControl>,
        menu: Arc<Menu>,
        policy: BackendErrorPolicy,
    ) -> Self {
        Self {
            name,
            state,
            next,
            control,
            menu,
            policy,
        }
    }
}

#[async_trait]
impl StageHandler for PickTorrentHandler {
    async fn handle(&self, turn: &mut Turn<'_>) -> Result<StateId, EngineError> {
        let torrents = match self.control.list_torrents().await {
            Ok(torrents) => torrents,
            Err(e) => {
                return backend_failure(self.policy, &self.menu, turn, &self.name, e.into())
            }
        };

        let displayed: Vec<String> = torrents.iter().map(TorrentSummary::choice_repr).collect();
        let Some(torrent_id) = parse::torrent_id(turn.text, &displayed) else {
            prompt_torrent_choice(turn, &torrents);
            return Ok(self.state);
        };

        let mut files = match self.control.list_torrent_files(torrent_id).await {
            Ok(files) => files,
            Err(e) => {
                return backend_failure(self.policy, &self.menu, turn, &self.name, e.into())
            }
        };
        files.sort_by(|a, b| a.name.cmp(&b.name));

        prompt_file_choice(turn, &files);
        Ok(self.next)
    }
}

/// Stage 2 of the torrent-file flow: resolve the `<int>.<int>:` selection
/// against a fresh file listing and invoke the callback.
///
/// A selection that fails to parse or resolve aborts back to the menu with
/// an explicit error reply. This is deliberately NOT a self-loop: the
/// echoed text may be stale (the file list can change between stages), so
/// re-prompting with the same options would be misleading.
pub struct PickFileHandler {
    name: String,
    action: FileAction,
    control: Arc<dyn TorrentControl>,
    menu: Arc<Menu>,
    policy: BackendErrorPolicy,
}

impl PickFileHandler {
    pub fn new(
        name: String,
        action: FileAction,
        control: Arc<dyn TorrentControl>,
        menu: Arc<Menu>,
        policy: BackendErrorPolicy,
    ) -> Self {
        Self {
            name,
            action,
            control,
            menu,
            policy,
        }
    }

    fn abort(&self, turn: &mut Turn<'_>) -> StateId {
        turn.reply("Error choosing torrent file");
        self.menu.present(turn)
    }
}

#[async_trait]
impl StageHandler for PickFileHandler {
    async fn handle(&self, turn: &mut Turn<'_>) -> Result<StateId, EngineError> {
        let Some((torrent_id, file_id)) = parse::torrent_file_id(turn.text) else {
            return Ok(self.abort(turn));
        };

        let files = match self.control.list_torrent_files(torrent_id).await {
            Ok(files) => files,
            // A vanished torrent is an unresolvable selection, not a fault.
            Err(TorrentControlError::TorrentNotFound(_)) => return Ok(self.abort(turn)),
            Err(e) => {
                return backend_failure(self.policy, &self.menu, turn, &self.name, e.into())
            }
        };

        let Some(file) = files.into_iter().find(|f| f.file_id == file_id) else {
            return Ok(self.abort(turn));
        };

        match (self.action)(file).await {
            Ok(reply) => {
                for line in reply.into_lines() {
                    turn.reply(format!("{}({}.{}) = {}", self.name, torrent_id, file_id, line));
                }
                Ok(self.menu.present(turn))
            }
            Err(e) => backend_failure(self.policy, &self.menu, turn, &self.name, e),
        }
    }
}
