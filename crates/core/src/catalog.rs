//! The fixed command catalog.
//!
//! Binds every top-level command to its flow kind and domain callback.
//! This is the whole surface of the bot; flows are not user-definable.

use std::sync::Arc;

use futures::FutureExt;

use crate::config::DownloadsConfig;
use crate::engine::{
    CommandReply, EngineBuilder, FileAction, ImmediateAction, MagnetAction, TorrentAction,
};
use crate::storage::StorageReporter;
use crate::transmission::TorrentControl;

/// Collaborators the catalog closes over.
pub struct CommandDeps {
    pub control: Arc<dyn TorrentControl>,
    pub storage: Arc<dyn StorageReporter>,
    pub downloads: DownloadsConfig,
}

/// Register the standard command set.
pub fn register_commands(builder: EngineBuilder, deps: &CommandDeps) -> EngineBuilder {
    builder
        .magnet(
            "add_tv_show",
            add_to_dir(&deps.control, &deps.downloads.tv_shows_dir),
        )
        .magnet(
            "add_movie",
            add_to_dir(&deps.control, &deps.downloads.movies_dir),
        )
        .immediate("list_torrents", list_torrents(&deps.control))
        .torrent("start_torrent", start_torrent(&deps.control))
        .torrent("stop_torrent", stop_torrent(&deps.control))
        .torrent("delete_torrent", delete_torrent(&deps.control))
        .torrent("list_torrent_files", list_torrent_files(&deps.control))
        .torrent_file("toggle_torrent_file", toggle_torrent_file(&deps.control))
        .torrent(
            "toggle_all_torrent_files",
            toggle_all_torrent_files(&deps.control),
        )
        .immediate("storage_stats", storage_stats(&deps.storage))
}

fn wanted_str(wanted: bool) -> &'static str {
    if wanted {
        "on"
    } else {
        "off"
    }
}

fn add_to_dir(control: &Arc<dyn TorrentControl>, dir: &str) -> MagnetAction {
    let control = Arc::clone(control);
    let dir = dir.to_string();
    Arc::new(move |uri: String| {
        let control = Arc::clone(&control);
        let dir = dir.clone();
        async move {
            let added = control.add_torrent(&uri, &dir).await?;
            let name = added
                .name
                .unwrap_or_else(|| format!("torrent {}", added.id));
            let status = if added.duplicate { "duplicate" } else { "added" };
            Ok(CommandReply::single(format!(
                "{} (id {}, {})",
                name, added.id, status
            )))
        }
        .boxed()
    })
}

fn list_torrents(control: &Arc<dyn TorrentControl>) -> ImmediateAction {
    let control = Arc::clone(control);
    Arc::new(move || {
        let control = Arc::clone(&control);
        async move {
            let torrents = control.list_torrents().await?;
            Ok(CommandReply::Many(
                torrents.iter().map(|t| t.status_repr()).collect(),
            ))
        }
        .boxed()
    })
}

fn start_torrent(control: &Arc<dyn TorrentControl>) -> TorrentAction {
    let control = Arc::clone(control);
    Arc::new(move |torrent_id| {
        let control = Arc::clone(&control);
        async move {
            control.start_torrent(torrent_id).await?;
            Ok(CommandReply::single("ok"))
        }
        .boxed()
    })
}

fn stop_torrent(control: &Arc<dyn TorrentControl>) -> TorrentAction {
    let control = Arc::clone(control);
    Arc::new(move |torrent_id| {
        let control = Arc::clone(&control);
        async move {
            control.stop_torrent(torrent_id).await?;
            Ok(CommandReply::single("ok"))
        }
        .boxed()
    })
}

fn delete_torrent(control: &Arc<dyn TorrentControl>) -> TorrentAction {
    let control = Arc::clone(control);
    Arc::new(move |torrent_id| {
        let control = Arc::clone(&control);
        async move {
            control.delete_torrent(torrent_id).await?;
            Ok(CommandReply::single("ok"))
        }
        .boxed()
    })
}

fn list_torrent_files(control: &Arc<dyn TorrentControl>) -> TorrentAction {
    let control = Arc::clone(control);
    Arc::new(move |torrent_id| {
        let control = Arc::clone(&control);
        async move {
            let mut files = control.list_torrent_files(torrent_id).await?;
            files.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(CommandReply::Many(
                files
                    .iter()
                    .map(|f| format!("{} [{}]", f.choice_repr(), wanted_str(f.wanted)))
                    .collect(),
            ))
        }
        .boxed()
    })
}

fn toggle_torrent_file(control: &Arc<dyn TorrentControl>) -> FileAction {
    let control = Arc::clone(control);
    Arc::new(move |file| {
        let control = Arc::clone(&control);
        async move {
            let wanted = control.toggle_torrent_file(&file).await?;
            Ok(CommandReply::single(wanted_str(wanted)))
        }
        .boxed()
    })
}

fn toggle_all_torrent_files(control: &Arc<dyn TorrentControl>) -> TorrentAction {
    let control = Arc::clone(control);
    Arc::new(move |torrent_id| {
        let control = Arc::clone(&control);
        async move {
            // TODO: batch into one torrent-set call per flip direction
            // instead of a request per file.
            let files = control.list_torrent_files(torrent_id).await?;
            let mut lines = Vec::with_capacity(files.len());
            for file in &files {
                let wanted = control.toggle_torrent_file(file).await?;
                lines.push(format!("{} -> {}", file.choice_repr(), wanted_str(wanted)));
            }
            Ok(CommandReply::Many(lines))
        }
        .boxed()
    })
}

fn storage_stats(storage: &Arc<dyn StorageReporter>) -> ImmediateAction {
    let storage = Arc::clone(storage);
    Arc::new(move || {
        let storage = Arc::clone(&storage);
        async move {
            let report = storage.report().await?;
            Ok(CommandReply::single(report))
        }
        .boxed()
    })
}
