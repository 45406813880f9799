//! Authentication gate.
//!
//! Allow-listed users go straight to the menu. Everyone else gets a numeric
//! one-time code scoped to their session; the code is printed to the log,
//! which stands in for a real out-of-band delivery channel.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rand::{thread_rng, Rng};
use tracing::{error, info};

use crate::chat::ChatId;

use super::menu::Menu;
use super::states::StateId;
use super::types::{EngineError, StageHandler, Turn};

/// Length of the one-time code, digit alphabet.
pub const CODE_LENGTH: usize = 5;

fn generate_code() -> String {
    let mut rng = thread_rng();
    (0..CODE_LENGTH)
        .map(|_| rng.gen_range(0..10u8).to_string())
        .collect()
}

/// Generate a fresh code and log it loudly; the log line is the delivery.
fn issue_code(chat_id: ChatId) -> String {
    let code = generate_code();

    error!("{}", "=".repeat(30));
    error!(chat_id = %chat_id, "ONE-TIME CODE: {}", code);
    error!("{}", "=".repeat(30));

    code
}

/// Entry point of every conversation.
///
/// Not wrapped in the cancellation middleware: there is no flow to escape
/// yet, and the menu must never be reachable before authentication.
pub struct EntryHandler {
    allow_list: HashSet<i64>,
    menu: Arc<Menu>,
    await_password: StateId,
}

impl EntryHandler {
    pub fn new(allow_list: HashSet<i64>, menu: Arc<Menu>, await_password: StateId) -> Self {
        Self {
            allow_list,
            menu,
            await_password,
        }
    }
}

#[async_trait]
impl StageHandler for EntryHandler {
    async fn handle(&self, turn: &mut Turn<'_>) -> Result<StateId, EngineError> {
        if self.allow_list.contains(&turn.user_id.0) {
            info!(user_id = %turn.user_id, "user authenticated via allow-list");
            return Ok(self.menu.present(turn));
        }

        let msg = format!("UserID {} needs to authenticate with a password", turn.user_id);
        info!("{}", msg);
        turn.reply(msg);

        turn.session.challenge = Some(issue_code(turn.chat_id));
        Ok(self.await_password)
    }
}

/// Checks the one-time code.
///
/// A wrong code is terminal for the conversation, not a retry loop: the
/// live code is rotated and the session is parked back at the entry state,
/// where the next message starts a fresh challenge.
pub struct AwaitPasswordHandler {
    menu: Arc<Menu>,
    entry: StateId,
}

impl AwaitPasswordHandler {
    pub fn new(menu: Arc<Menu>, entry: StateId) -> Self {
        Self { menu, entry }
    }
}

#[async_trait]
impl StageHandler for AwaitPasswordHandler {
    async fn handle(&self, turn: &mut Turn<'_>) -> Result<StateId, EngineError> {
        let success = turn
            .session
            .challenge
            .as_deref()
            .is_some_and(|code| code == turn.text);

        info!(
            user_id = %turn.user_id,
            success,
            attempt = %turn.text,
            "one-time code attempt"
        );

        if !success {
            turn.session.challenge = Some(issue_code(turn.chat_id));
            return Ok(self.entry);
        }

        turn.session.challenge = None;
        Ok(self.menu.present(turn))
    }
}
