//! The messaging surface the bot talks through.
//!
//! Handlers only ever see the types in this module. The wire protocol
//! lives behind [`Gateway`] and [`UpdateSource`] (see [`crate::telegram`]).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::i18n::Lang;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sent message, addressable for edits and deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat: ChatId,
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub language_code: Option<String>,
}

impl User {
    /// `@username` when there is one, the first name otherwise.
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(username) if !username.is_empty() => format!("@{username}"),
            _ => self.first_name.clone(),
        }
    }

    /// Display name plus the numeric id, for audit lines.
    pub fn audit_name(&self) -> String {
        format!("{} (ID: {})", self.display_name(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard, row-major.
pub type Keyboard = Vec<Vec<Button>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub enum Update {
    UserJoined {
        chat: ChatId,
        users: Vec<User>,
    },
    UserLeft {
        chat: ChatId,
        user: User,
    },
    Text {
        chat: ChatId,
        kind: ChatKind,
        message: MessageRef,
        from: User,
        text: String,
    },
    ButtonPress {
        id: String,
        from: User,
        /// The message the button was attached to, with its current text.
        message: Option<(MessageRef, String)>,
        data: Option<String>,
        short_tag: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api rejected {method}: {description}")]
    Api { method: String, description: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, GatewayError>;

    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, GatewayError>;

    async fn delete(&self, message: MessageRef) -> Result<(), GatewayError>;

    async fn restrict_user(
        &self,
        chat: ChatId,
        user: UserId,
        allow_posting: bool,
    ) -> Result<(), GatewayError>;

    /// Acknowledges a button press, optionally with a short toast.
    async fn answer_button(&self, id: &str, text: Option<&str>) -> Result<(), GatewayError>;

    async fn set_commands(
        &self,
        lang: Option<Lang>,
        commands: &[BotCommand],
    ) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait UpdateSource: Send {
    /// Waits for the next batch of updates. An empty batch is fine;
    /// `None` means the source is exhausted.
    async fn next_batch(&mut self) -> Result<Option<Vec<Update>>, GatewayError>;
}

/// Deletes `message` after `after` on a detached task. The task owns its
/// target; if the message is gone by then the failure is dropped.
pub fn schedule_delete(gateway: Arc<dyn Gateway>, message: MessageRef, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        if let Err(e) = gateway.delete(message).await {
            tracing::debug!(chat_id = %message.chat, message_id = message.id, "deferred delete skipped: {e}");
        }
    });
}
