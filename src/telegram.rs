//! Bot API adapter over `reqwest`.
//!
//! Only this module knows the wire format. Everything it hands out is a
//! [`crate::gateway::Update`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::gateway::{
    BotCommand, ChatId, ChatKind, Gateway, GatewayError, Keyboard, MessageRef, Update,
    UpdateSource, User, UserId,
};
use crate::i18n::Lang;

const API_URL: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramGateway {
    client: Client,
    base_url: String,
}

impl TelegramGateway {
    /// `timeout` bounds every request, so it has to outlast a long poll.
    pub fn new(token: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("{API_URL}/bot{token}"),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, GatewayError> {
        let resp: ApiResponse<T> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        match resp {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(GatewayError::Api {
                method: method.to_owned(),
                description: description.unwrap_or_else(|| "no description".to_owned()),
            }),
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: i64,
    #[serde(default)]
    is_bot: bool,
    first_name: String,
    username: Option<String>,
    language_code: Option<String>,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        User {
            id: UserId(raw.id),
            username: raw.username,
            first_name: raw.first_name,
            language_code: raw.language_code,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    message_id: i64,
    chat: RawChat,
    from: Option<RawUser>,
    text: Option<String>,
    #[serde(default)]
    new_chat_members: Vec<RawUser>,
    left_chat_member: Option<RawUser>,
}

impl RawMessage {
    fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat: ChatId(self.chat.id),
            id: self.message_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCallback {
    id: String,
    from: RawUser,
    message: Option<RawMessage>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    update_id: i64,
    message: Option<RawMessage>,
    callback_query: Option<RawCallback>,
}

impl RawUpdate {
    fn into_update(self) -> Option<Update> {
        if let Some(callback) = self.callback_query {
            let (data, short_tag) = split_payload(callback.data);
            return Some(Update::ButtonPress {
                id: callback.id,
                from: callback.from.into(),
                message: callback.message.map(|m| (m.message_ref(), m.text.unwrap_or_default())),
                data,
                short_tag,
            });
        }

        let message = self.message?;
        let chat = ChatId(message.chat.id);
        let reference = message.message_ref();

        if !message.new_chat_members.is_empty() {
            let users: Vec<User> = message
                .new_chat_members
                .into_iter()
                .filter(|u| !u.is_bot)
                .map(User::from)
                .collect();
            return (!users.is_empty()).then_some(Update::UserJoined { chat, users });
        }
        if let Some(user) = message.left_chat_member {
            return Some(Update::UserLeft {
                chat,
                user: user.into(),
            });
        }

        let from = message.from?;
        if from.is_bot {
            return None;
        }
        Some(Update::Text {
            chat,
            kind: match message.chat.kind.as_str() {
                "private" => ChatKind::Private,
                _ => ChatKind::Group,
            },
            message: reference,
            from: from.into(),
            text: message.text?,
        })
    }
}

/// A payload of the form `"\u{c}<tag>|<data>"` carries both fields; a
/// plain one carries only data.
fn split_payload(raw: Option<String>) -> (Option<String>, Option<String>) {
    let Some(raw) = raw else {
        return (None, None);
    };
    match raw.strip_prefix('\u{c}').and_then(|rest| rest.split_once('|')) {
        Some((tag, data)) => (
            Some(data.to_owned()).filter(|d| !d.is_empty()),
            Some(tag.to_owned()).filter(|t| !t.is_empty()),
        ),
        None => (Some(raw), None),
    }
}

fn markup(keyboard: &Keyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.text, "callback_data": b.data }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
    chat: RawChat,
}

#[async_trait]
impl Gateway for TelegramGateway {
    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, GatewayError> {
        let mut body = json!({ "chat_id": chat.0, "text": text });
        if let Some(keyboard) = &keyboard {
            body["reply_markup"] = markup(keyboard);
        }
        let sent: SentMessage = self.call("sendMessage", body).await?;
        Ok(MessageRef {
            chat: ChatId(sent.chat.id),
            id: sent.message_id,
        })
    }

    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, GatewayError> {
        let mut body = json!({
            "chat_id": message.chat.0,
            "message_id": message.id,
            "text": text,
        });
        if let Some(keyboard) = &keyboard {
            body["reply_markup"] = markup(keyboard);
        }
        // inline messages answer `true` instead of the message
        let _: Value = self.call("editMessageText", body).await?;
        Ok(message)
    }

    async fn delete(&self, message: MessageRef) -> Result<(), GatewayError> {
        let _: bool = self
            .call(
                "deleteMessage",
                json!({ "chat_id": message.chat.0, "message_id": message.id }),
            )
            .await?;
        Ok(())
    }

    async fn restrict_user(
        &self,
        chat: ChatId,
        user: UserId,
        allow_posting: bool,
    ) -> Result<(), GatewayError> {
        let _: bool = self
            .call(
                "restrictChatMember",
                json!({
                    "chat_id": chat.0,
                    "user_id": user.0,
                    "permissions": {
                        "can_send_messages": allow_posting,
                        "can_send_audios": allow_posting,
                        "can_send_documents": allow_posting,
                        "can_send_photos": allow_posting,
                        "can_send_videos": allow_posting,
                        "can_send_video_notes": allow_posting,
                        "can_send_voice_notes": allow_posting,
                        "can_send_polls": allow_posting,
                        "can_send_other_messages": allow_posting,
                        "can_add_web_page_previews": allow_posting,
                    },
                }),
            )
            .await?;
        Ok(())
    }

    async fn answer_button(&self, id: &str, text: Option<&str>) -> Result<(), GatewayError> {
        let mut body = json!({ "callback_query_id": id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: bool = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }

    async fn set_commands(
        &self,
        lang: Option<Lang>,
        commands: &[BotCommand],
    ) -> Result<(), GatewayError> {
        let commands: Vec<Value> = commands
            .iter()
            .map(|c| json!({ "command": c.command, "description": c.description }))
            .collect();
        let mut body = json!({ "commands": commands });
        if let Some(lang) = lang {
            body["language_code"] = json!(lang.code());
        }
        let _: bool = self.call("setMyCommands", body).await?;
        Ok(())
    }
}

/// `getUpdates` long poll. Never runs dry.
pub struct LongPoller {
    api: TelegramGateway,
    offset: i64,
    timeout: Duration,
}

impl LongPoller {
    pub fn new(api: TelegramGateway, timeout: Duration) -> Self {
        Self {
            api,
            offset: 0,
            timeout,
        }
    }
}

#[async_trait]
impl UpdateSource for LongPoller {
    async fn next_batch(&mut self) -> Result<Option<Vec<Update>>, GatewayError> {
        let raw: Vec<Value> = self
            .api
            .call(
                "getUpdates",
                json!({
                    "offset": self.offset,
                    "timeout": self.timeout.as_secs(),
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;

        let mut updates = Vec::with_capacity(raw.len());
        for value in raw {
            // acknowledge even what we cannot read, or it comes back forever
            if let Some(id) = value.get("update_id").and_then(Value::as_i64) {
                self.offset = self.offset.max(id + 1);
            }
            match serde_json::from_value::<RawUpdate>(value) {
                Ok(raw) => {
                    let id = raw.update_id;
                    match raw.into_update() {
                        Some(update) => updates.push(update),
                        None => tracing::trace!(update_id = id, "ignoring update"),
                    }
                }
                Err(e) => tracing::warn!("skipping unreadable update: {e}"),
            }
        }
        Ok(Some(updates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(value: Value) -> Option<Update> {
        serde_json::from_value::<RawUpdate>(value).unwrap().into_update()
    }

    #[test]
    fn payload_with_tag_splits_in_two() {
        assert_eq!(
            split_payload(Some("\u{c}rate_cancel|rate_submit".to_owned())),
            (Some("rate_submit".to_owned()), Some("rate_cancel".to_owned()))
        );
        assert_eq!(
            split_payload(Some("\u{c}rate_cancel|".to_owned())),
            (None, Some("rate_cancel".to_owned()))
        );
        assert_eq!(
            split_payload(Some("rate_submit".to_owned())),
            (Some("rate_submit".to_owned()), None)
        );
        assert_eq!(split_payload(None), (None, None));
    }

    #[test]
    fn private_text_becomes_text_update() {
        let update = decode(json!({
            "update_id": 10,
            "message": {
                "message_id": 3,
                "chat": { "id": 42, "type": "private" },
                "from": { "id": 42, "is_bot": false, "first_name": "Ada", "language_code": "en-GB" },
                "text": "/rate"
            }
        }));
        let Some(Update::Text { kind, from, text, message, .. }) = update else {
            panic!("expected a text update, got {update:?}");
        };
        assert_eq!(kind, ChatKind::Private);
        assert_eq!(from.language_code.as_deref(), Some("en-GB"));
        assert_eq!(text, "/rate");
        assert_eq!(message, MessageRef { chat: ChatId(42), id: 3 });
    }

    #[test]
    fn joins_skip_bots() {
        let update = decode(json!({
            "update_id": 11,
            "message": {
                "message_id": 4,
                "chat": { "id": -100, "type": "supergroup" },
                "new_chat_members": [
                    { "id": 1, "is_bot": true, "first_name": "Helper" },
                    { "id": 2, "is_bot": false, "first_name": "Ada", "username": "ada" }
                ]
            }
        }));
        let Some(Update::UserJoined { users, chat }) = update else {
            panic!("expected a join");
        };
        assert_eq!(chat, ChatId(-100));
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, UserId(2));
    }

    #[test]
    fn callback_keeps_message_text() {
        let update = decode(json!({
            "update_id": 12,
            "callback_query": {
                "id": "cb1",
                "from": { "id": 7, "first_name": "Admin" },
                "message": {
                    "message_id": 9,
                    "chat": { "id": -5, "type": "group" },
                    "text": "New review"
                },
                "data": "rate_approve_3"
            }
        }));
        let Some(Update::ButtonPress { id, message, data, short_tag, .. }) = update else {
            panic!("expected a button press");
        };
        assert_eq!(id, "cb1");
        assert_eq!(message.unwrap().1, "New review");
        assert_eq!(data.as_deref(), Some("rate_approve_3"));
        assert_eq!(short_tag, None);
    }
}
