use std::fmt;

/// Telegram chat id (numeric). One conversation per chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Telegram user id (numeric).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One inbound chat message, as handed over by the transport.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
}

/// One outbound reply produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Keyboard,
}

/// Reply keyboard attached to an outbound message.
///
/// `Buttons` rows are rendered as tappable options that echo their label
/// back as plain text; that echoed text is the selection protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Remove any previously shown keyboard.
    Remove,
    /// Ordered button rows.
    Buttons(Vec<Vec<String>>),
}

impl Keyboard {
    /// One button per row, in order.
    pub fn single_column<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Keyboard::Buttons(labels.into_iter().map(|l| vec![l.into()]).collect())
    }
}
