//! Minimal Telegram Bot API client.
//!
//! Only the two methods the bot needs: `getUpdates` (long polling) and
//! `sendMessage` with reply-keyboard markup. Keyboards are plain text
//! buttons; a tap echoes the label back as an ordinary message, which is
//! what the engine's choice parser works from.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use telemission_core::{ChatId, Keyboard};

/// Errors talking to the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {0}")]
    Api(String),
}

/// One element of the getUpdates stream.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope every Bot API response arrives in.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: i64,
    text: &'a str,
    reply_markup: ReplyMarkup,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

#[derive(Debug, Serialize)]
struct ReplyKeyboardMarkup {
    keyboard: Vec<Vec<String>>,
    resize_keyboard: bool,
    one_time_keyboard: bool,
    selective: bool,
}

#[derive(Debug, Serialize)]
struct ReplyKeyboardRemove {
    remove_keyboard: bool,
}

impl From<&Keyboard> for ReplyMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        match keyboard {
            Keyboard::Remove => ReplyMarkup::Remove(ReplyKeyboardRemove {
                remove_keyboard: true,
            }),
            Keyboard::Buttons(rows) => ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
                keyboard: rows.clone(),
                resize_keyboard: true,
                one_time_keyboard: true,
                selective: true,
            }),
        }
    }
}

/// Bot API client.
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    /// Create a client for the given bot token.
    ///
    /// The HTTP timeout must outlast the long-poll window, so it is the
    /// poll timeout plus a margin.
    pub fn new(token: &str, poll_timeout_secs: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs as u64 + 10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("https://api.telegram.org/bot{}", token),
        }
    }

    fn map_error(e: reqwest::Error) -> TelegramError {
        if e.is_timeout() {
            TelegramError::Timeout
        } else {
            TelegramError::Request(e.to_string())
        }
    }

    fn unwrap_response<T>(response: ApiResponse<T>) -> Result<Option<T>, TelegramError> {
        if !response.ok {
            return Err(TelegramError::Api(
                response
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            ));
        }
        Ok(response.result)
    }

    /// Long-poll for updates newer than `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u32,
    ) -> Result<Vec<Update>, TelegramError> {
        let url = format!("{}/getUpdates", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("offset", offset), ("timeout", timeout_secs as i64)])
            .send()
            .await
            .map_err(Self::map_error)?;

        let parsed: ApiResponse<Vec<Update>> =
            response.json().await.map_err(Self::map_error)?;

        Ok(Self::unwrap_response(parsed)?.unwrap_or_default())
    }

    /// Send one reply, with its keyboard.
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: &Keyboard,
    ) -> Result<(), TelegramError> {
        let url = format!("{}/sendMessage", self.base_url);
        let body = SendMessageBody {
            chat_id: chat_id.0,
            text,
            reply_markup: ReplyMarkup::from(keyboard),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_error)?;

        let parsed: ApiResponse<serde_json::Value> =
            response.json().await.map_err(Self::map_error)?;

        Self::unwrap_response(parsed)?;
        Ok(())
    }
}
