//! Main menu: command labels, presentation and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::chat::Keyboard;
use crate::config::BackendErrorPolicy;

use super::flows::backend_failure;
use super::states::StateId;
use super::types::{EngineError, ImmediateAction, StageHandler, Turn};

/// Spaced/capitalized rendering of an internal command name.
///
/// `add_tv_show` becomes `Add Tv Show`; this is both the button label and
/// the text the dispatcher matches against when the user taps it.
pub fn display_label(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The main menu: the universal return point after any flow completes,
/// errors out, or is cancelled.
pub struct Menu {
    state: StateId,
    labels: Vec<String>,
}

impl Menu {
    pub fn new(state: StateId, labels: Vec<String>) -> Self {
        Self { state, labels }
    }

    /// The state awaiting a menu selection.
    pub fn state(&self) -> StateId {
        self.state
    }

    /// Send the command keyboard and park the session at the choice state.
    pub fn present(&self, turn: &mut Turn<'_>) -> StateId {
        turn.reply_with_keyboard(
            "Enter command:",
            Keyboard::single_column(self.labels.iter().cloned()),
        );
        self.state
    }
}

/// Where a recognized menu label leads.
pub enum MenuTarget {
    /// Runs at selection time and returns straight to the menu.
    Immediate {
        name: String,
        action: ImmediateAction,
    },
    /// Hands the turn to the flow's entry stage, which prompts and parks
    /// the session in its own state.
    Flow { entry: Arc<dyn StageHandler> },
}

/// Handler for the menu-choice state.
///
/// Unrecognized text re-presents the menu; it is never an error.
pub struct MenuChoiceHandler {
    menu: Arc<Menu>,
    targets: HashMap<String, MenuTarget>,
    policy: BackendErrorPolicy,
}

impl MenuChoiceHandler {
    pub fn new(
        menu: Arc<Menu>,
        targets: HashMap<String, MenuTarget>,
        policy: BackendErrorPolicy,
    ) -> Self {
        Self {
            menu,
            targets,
            policy,
        }
    }
}

#[async_trait]
impl StageHandler for MenuChoiceHandler {
    async fn handle(&self, turn: &mut Turn<'_>) -> Result<StateId, EngineError> {
        let Some(target) = self.targets.get(turn.text) else {
            return Ok(self.menu.present(turn));
        };

        match target {
            MenuTarget::Immediate { name, action } => {
                info!(user_id = turn.user_id.0, command = %name, "command selected");
                match action().await {
                    Ok(reply) => {
                        for line in reply.into_lines() {
                            turn.reply(line);
                        }
                        Ok(self.menu.present(turn))
                    }
                    Err(e) => backend_failure(self.policy, &self.menu, turn, name, e),
                }
            }
            MenuTarget::Flow { entry } => {
                info!(user_id = turn.user_id.0, command = %turn.text, "flow entered");
                entry.handle(turn).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_capitalizes_parts() {
        assert_eq!(display_label("add_tv_show"), "Add Tv Show");
        assert_eq!(display_label("list_torrents"), "List Torrents");
        assert_eq!(display_label("storage_stats"), "Storage Stats");
    }

    #[test]
    fn test_display_label_skips_empty_parts() {
        assert_eq!(display_label("__toggle__file"), "Toggle File");
        assert_eq!(display_label("single"), "Single");
    }
}
