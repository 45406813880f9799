//! Shared types for the conversation engine.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

use crate::chat::{ChatId, Incoming, Keyboard, Outgoing, UserId};
use crate::storage::StorageError;
use crate::transmission::{TorrentControlError, TorrentFileRef};

use super::session::Session;
use super::states::StateId;

/// Errors that can occur while processing a turn.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The session points at a state with no registered handler.
    #[error("no handler registered for state {0}")]
    UnknownState(StateId),

    /// A command name was registered twice while building the engine.
    #[error("duplicate command name: {0}")]
    DuplicateCommand(String),

    /// Torrent backend failure, surfaced under the `fail` policy.
    #[error("torrent backend error: {0}")]
    Backend(#[from] TorrentControlError),

    /// Storage reporter failure, surfaced under the `fail` policy.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result of a domain callback.
///
/// The discriminant decides how many reply messages the flow emits; no
/// runtime type inspection is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// One reply message.
    Single(String),
    /// One reply message per element, in order.
    Many(Vec<String>),
}

impl CommandReply {
    pub fn single(text: impl Into<String>) -> Self {
        CommandReply::Single(text.into())
    }

    /// The reply lines, regardless of arity.
    pub fn into_lines(self) -> Vec<String> {
        match self {
            CommandReply::Single(line) => vec![line],
            CommandReply::Many(lines) => lines,
        }
    }
}

/// Outcome of a domain callback.
pub type ActionResult = Result<CommandReply, EngineError>;

/// Callback for commands that run straight from the menu.
pub type ImmediateAction = Arc<dyn Fn() -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// Callback bound by the magnet flow; receives the raw magnet URI.
pub type MagnetAction = Arc<dyn Fn(String) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// Callback bound by the single-torrent flow; receives the chosen torrent id.
pub type TorrentAction = Arc<dyn Fn(i64) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// Callback bound by the torrent-file flow; receives the resolved file.
pub type FileAction =
    Arc<dyn Fn(TorrentFileRef) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// One inbound message being processed: the session it belongs to, the
/// message text, and a buffer of replies accumulated by the handler chain.
pub struct Turn<'a> {
    pub session: &'a mut Session,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: &'a str,
    replies: Vec<Outgoing>,
}

impl<'a> Turn<'a> {
    pub fn new(session: &'a mut Session, incoming: &'a Incoming) -> Self {
        Self {
            session,
            chat_id: incoming.chat_id,
            user_id: incoming.user_id,
            text: &incoming.text,
            replies: Vec::new(),
        }
    }

    /// Queue a plain reply; any previously shown keyboard is removed.
    pub fn reply(&mut self, text: impl Into<String>) {
        self.reply_with_keyboard(text, Keyboard::Remove);
    }

    /// Queue a reply with an explicit keyboard.
    pub fn reply_with_keyboard(&mut self, text: impl Into<String>, keyboard: Keyboard) {
        self.replies.push(Outgoing {
            chat_id: self.chat_id,
            text: text.into(),
            keyboard,
        });
    }

    /// Drain the accumulated replies, in queue order.
    pub fn take_replies(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.replies)
    }
}

/// A single stage of the conversation: consumes the turn, queues replies,
/// returns the state the session parks in next.
#[async_trait]
pub trait StageHandler: Send + Sync {
    async fn handle(&self, turn: &mut Turn<'_>) -> Result<StateId, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::states::StateRegistry;

    fn turn_fixture(text: &str) -> (Session, Incoming) {
        let mut registry = StateRegistry::new();
        let entry = registry.register("entry");
        let session = Session::new(entry);
        let incoming = Incoming {
            chat_id: ChatId(1),
            user_id: UserId(2),
            text: text.to_string(),
        };
        (session, incoming)
    }

    #[test]
    fn test_turn_collects_replies_in_order() {
        let (mut session, incoming) = turn_fixture("hi");
        let mut turn = Turn::new(&mut session, &incoming);

        turn.reply("first");
        turn.reply_with_keyboard("second", Keyboard::single_column(["Cancel"]));

        let replies = turn.take_replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].text, "first");
        assert_eq!(replies[0].keyboard, Keyboard::Remove);
        assert_eq!(replies[1].text, "second");
        assert!(turn.take_replies().is_empty());
    }

    #[test]
    fn test_command_reply_into_lines() {
        assert_eq!(CommandReply::single("a").into_lines(), vec!["a".to_string()]);
        assert_eq!(
            CommandReply::Many(vec!["a".into(), "b".into()]).into_lines(),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
