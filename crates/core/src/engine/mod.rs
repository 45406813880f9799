//! The conversation engine.
//!
//! Turns a linear sequence of chat messages into state transitions: each
//! inbound message is dispatched to the handler of the session's current
//! state, the handler queues replies and names the next state, and the
//! engine persists that state for the session.
//!
//! The full transition table is built once by [`EngineBuilder`] and is
//! immutable afterwards; there is no runtime name resolution.

mod auth;
mod flows;
mod menu;
mod parse;
mod session;
mod states;
mod types;

pub use auth::CODE_LENGTH;
pub use menu::display_label;
pub use session::Session;
pub use states::{StateId, StateRegistry};
pub use types::{
    ActionResult, CommandReply, EngineError, FileAction, ImmediateAction, MagnetAction,
    StageHandler, TorrentAction, Turn,
};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::chat::{ChatId, Incoming, Outgoing};
use crate::config::BackendErrorPolicy;
use crate::transmission::TorrentControl;

use auth::{AwaitPasswordHandler, EntryHandler};
use flows::{Cancelable, MagnetFlowHandler, PickFileHandler, PickTorrentHandler, TorrentFlowHandler};
use menu::{Menu, MenuChoiceHandler, MenuTarget};

/// Top-level escape hatch, checked before state dispatch.
const CANCEL_COMMAND: &str = "/cancel";

enum CommandKind {
    Immediate(ImmediateAction),
    Magnet(MagnetAction),
    Torrent(TorrentAction),
    TorrentFile(FileAction),
}

struct CommandSpec {
    name: String,
    kind: CommandKind,
}

/// Builds the engine: registers commands, then freezes the state table.
pub struct EngineBuilder {
    control: Arc<dyn TorrentControl>,
    policy: BackendErrorPolicy,
    allow_list: HashSet<i64>,
    commands: Vec<CommandSpec>,
}

impl EngineBuilder {
    pub fn new(control: Arc<dyn TorrentControl>, policy: BackendErrorPolicy) -> Self {
        Self {
            control,
            policy,
            allow_list: HashSet::new(),
            commands: Vec::new(),
        }
    }

    /// Users that skip the one-time code challenge.
    pub fn allow_users(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.allow_list.extend(ids);
        self
    }

    /// A command that runs straight from the menu.
    pub fn immediate(mut self, name: &str, action: ImmediateAction) -> Self {
        self.commands.push(CommandSpec {
            name: name.to_string(),
            kind: CommandKind::Immediate(action),
        });
        self
    }

    /// A command collecting a magnet URI.
    pub fn magnet(mut self, name: &str, action: MagnetAction) -> Self {
        self.commands.push(CommandSpec {
            name: name.to_string(),
            kind: CommandKind::Magnet(action),
        });
        self
    }

    /// A command selecting one torrent.
    pub fn torrent(mut self, name: &str, action: TorrentAction) -> Self {
        self.commands.push(CommandSpec {
            name: name.to_string(),
            kind: CommandKind::Torrent(action),
        });
        self
    }

    /// A command selecting a torrent, then one of its files.
    pub fn torrent_file(mut self, name: &str, action: FileAction) -> Self {
        self.commands.push(CommandSpec {
            name: name.to_string(),
            kind: CommandKind::TorrentFile(action),
        });
        self
    }

    /// Freeze the command catalog into a transition table.
    pub fn build(self) -> Result<ConversationEngine, EngineError> {
        let mut seen = HashSet::new();
        for spec in &self.commands {
            if !seen.insert(spec.name.clone()) {
                return Err(EngineError::DuplicateCommand(spec.name.clone()));
            }
        }

        let mut registry = StateRegistry::new();
        let entry = registry.register("entry");
        let await_password = registry.register("await_password");
        let menu_state = registry.register("menu_choice");

        let labels: Vec<String> = self
            .commands
            .iter()
            .map(|c| display_label(&c.name))
            .collect();
        let menu = Arc::new(Menu::new(menu_state, labels));

        let mut handlers: HashMap<StateId, Arc<dyn StageHandler>> = HashMap::new();
        let mut targets: HashMap<String, MenuTarget> = HashMap::new();

        for spec in self.commands {
            let label = display_label(&spec.name);
            match spec.kind {
                CommandKind::Immediate(action) => {
                    targets.insert(
                        label,
                        MenuTarget::Immediate {
                            name: spec.name,
                            action,
                        },
                    );
                }
                CommandKind::Magnet(action) => {
                    let state = registry.register(&spec.name);
                    let handler: Arc<dyn StageHandler> = Arc::new(Cancelable::new(
                        MagnetFlowHandler::new(
                            spec.name,
                            state,
                            action,
                            Arc::clone(&menu),
                            self.policy,
                        ),
                        Arc::clone(&menu),
                    ));
                    handlers.insert(state, Arc::clone(&handler));
                    targets.insert(label, MenuTarget::Flow { entry: handler });
                }
                CommandKind::Torrent(action) => {
                    let state = registry.register(&spec.name);
                    let handler: Arc<dyn StageHandler> = Arc::new(Cancelable::new(
                        TorrentFlowHandler::new(
                            spec.name,
                            state,
                            action,
                            Arc::clone(&self.control),
                            Arc::clone(&menu),
                            self.policy,
                        ),
                        Arc::clone(&menu),
                    ));
                    handlers.insert(state, Arc::clone(&handler));
                    targets.insert(label, MenuTarget::Flow { entry: handler });
                }
                CommandKind::TorrentFile(action) => {
                    let pick_state = registry.register(&spec.name);
                    let file_state = registry.register(&format!("{}_file_choice", spec.name));

                    let pick: Arc<dyn StageHandler> = Arc::new(Cancelable::new(
                        PickTorrentHandler::new(
                            spec.name.clone(),
                            pick_state,
                            file_state,
                            Arc::clone(&self.control),
                            Arc::clone(&menu),
                            self.policy,
                        ),
                        Arc::clone(&menu),
                    ));
                    let choose: Arc<dyn StageHandler> = Arc::new(Cancelable::new(
                        PickFileHandler::new(
                            spec.name,
                            action,
                            Arc::clone(&self.control),
                            Arc::clone(&menu),
                            self.policy,
                        ),
                        Arc::clone(&menu),
                    ));

                    handlers.insert(pick_state, Arc::clone(&pick));
                    handlers.insert(file_state, choose);
                    targets.insert(label, MenuTarget::Flow { entry: pick });
                }
            }
        }

        handlers.insert(
            menu_state,
            Arc::new(MenuChoiceHandler::new(
                Arc::clone(&menu),
                targets,
                self.policy,
            )),
        );
        handlers.insert(
            entry,
            Arc::new(EntryHandler::new(
                self.allow_list,
                Arc::clone(&menu),
                await_password,
            )),
        );
        handlers.insert(await_password, Arc::new(AwaitPasswordHandler::new(menu, entry)));

        Ok(ConversationEngine {
            handlers,
            sessions: Mutex::new(HashMap::new()),
            entry,
            registry,
        })
    }
}

/// The state machine proper.
pub struct ConversationEngine {
    handlers: HashMap<StateId, Arc<dyn StageHandler>>,
    sessions: Mutex<HashMap<ChatId, Session>>,
    entry: StateId,
    registry: StateRegistry,
}

impl ConversationEngine {
    pub fn builder(control: Arc<dyn TorrentControl>, policy: BackendErrorPolicy) -> EngineBuilder {
        EngineBuilder::new(control, policy)
    }

    /// Drive one inbound message through the session's current state.
    ///
    /// The caller must deliver messages of one chat sequentially; unrelated
    /// chats may interleave freely.
    pub async fn handle_message(&self, incoming: Incoming) -> Result<Vec<Outgoing>, EngineError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(incoming.chat_id).or_insert_with(|| {
            debug!(chat_id = %incoming.chat_id, "new session");
            Session::new(self.entry)
        });
        session.touch();

        let current = session.state;

        if incoming.text.trim() == CANCEL_COMMAND {
            session.reset(self.entry);
            debug!(chat_id = %incoming.chat_id, from = %current, "conversation cancelled");
            return Ok(vec![Outgoing {
                chat_id: incoming.chat_id,
                text: "Cancelled.".to_string(),
                keyboard: crate::chat::Keyboard::Remove,
            }]);
        }

        let handler = Arc::clone(
            self.handlers
                .get(&current)
                .ok_or(EngineError::UnknownState(current))?,
        );

        let mut turn = Turn::new(session, &incoming);
        let next = handler.handle(&mut turn).await?;
        let replies = turn.take_replies();

        session.state = next;
        debug!(
            chat_id = %incoming.chat_id,
            from = %current,
            to = %next,
            from_name = self.registry.name_of(current).unwrap_or("?"),
            to_name = self.registry.name_of(next).unwrap_or("?"),
            "transition"
        );

        Ok(replies)
    }

    /// The id a state name resolved to, for tests and logging.
    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.registry.lookup(name)
    }

    /// The state a chat's session is currently parked in.
    pub async fn session_state(&self, chat_id: ChatId) -> Option<StateId> {
        self.sessions.lock().await.get(&chat_id).map(|s| s.state)
    }

    /// The live one-time code of a chat's session, if a challenge is pending.
    pub async fn session_challenge(&self, chat_id: ChatId) -> Option<String> {
        self.sessions
            .lock()
            .await
            .get(&chat_id)
            .and_then(|s| s.challenge.clone())
    }
}
