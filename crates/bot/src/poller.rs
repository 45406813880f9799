//! The update loop: getUpdates -> engine -> sendMessage.
//!
//! A single sequential task, so each inbound message drives exactly one
//! state transition to completion before the next one is read. That is the
//! engine's sequencing contract; no further synchronization is needed.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use telemission_core::{ChatId, ConversationEngine, Incoming, UserId};

use crate::telegram::{TelegramApi, Update};

/// Pause before retrying after a failed getUpdates call.
const RETRY_DELAY: Duration = Duration::from_secs(3);

pub struct Poller {
    api: TelegramApi,
    engine: ConversationEngine,
    poll_timeout_secs: u32,
}

impl Poller {
    pub fn new(api: TelegramApi, engine: ConversationEngine, poll_timeout_secs: u32) -> Self {
        Self {
            api,
            engine,
            poll_timeout_secs,
        }
    }

    /// Poll until `shutdown` resolves.
    ///
    /// Transport errors are retried; an engine error is fatal (it only
    /// surfaces under the `fail` backend policy).
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);

        let mut offset = 0i64;
        loop {
            let updates = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping poller");
                    return Ok(());
                }
                result = self.api.get_updates(offset, self.poll_timeout_secs) => {
                    match result {
                        Ok(updates) => updates,
                        Err(e) => {
                            warn!("getUpdates failed: {}", e);
                            tokio::time::sleep(RETRY_DELAY).await;
                            continue;
                        }
                    }
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let Some(incoming) = incoming_from(update) else {
                    continue;
                };

                let replies = self
                    .engine
                    .handle_message(incoming)
                    .await
                    .context("conversation engine failed")?;

                for reply in replies {
                    if let Err(e) = self
                        .api
                        .send_message(reply.chat_id, &reply.text, &reply.keyboard)
                        .await
                    {
                        warn!(chat_id = %reply.chat_id, "sendMessage failed: {}", e);
                    }
                }
            }
        }
    }
}

/// Project a transport update onto the engine's vocabulary.
///
/// Updates without a text message (stickers, edits, channel posts) are
/// skipped entirely.
fn incoming_from(update: Update) -> Option<Incoming> {
    let message = update.message?;
    let text = message.text?;
    let from = message.from?;

    Some(Incoming {
        chat_id: ChatId(message.chat.id),
        user_id: UserId(from.id),
        text,
    })
}
