#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use capyguard::AppState;
use capyguard::config::{Config, Policy};
use capyguard::gateway::{
    BotCommand, ChatId, ChatKind, Gateway, GatewayError, Keyboard, MessageRef, Update,
    UpdateSource, User, UserId,
};
use capyguard::handlers;
use capyguard::i18n::Lang;

pub const ADMIN: ChatId = ChatId(-1000);
pub const GROUP: ChatId = ChatId(-2000);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send {
        message: MessageRef,
        text: String,
        buttons: Vec<String>,
    },
    Edit {
        message: MessageRef,
        text: String,
        buttons: Vec<String>,
    },
    Delete(MessageRef),
    Restrict {
        chat: ChatId,
        user: UserId,
        allow_posting: bool,
    },
    Answer {
        text: Option<String>,
    },
    SetCommands {
        lang: Option<Lang>,
        count: usize,
    },
}

fn button_data(keyboard: &Option<Keyboard>) -> Vec<String> {
    keyboard
        .iter()
        .flatten()
        .flatten()
        .map(|b| b.data.clone())
        .collect()
}

/// Records every call and hands out increasing message ids.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    fail_sends: AtomicBool,
}

impl RecordingGateway {
    /// Makes every following `send` fail until switched back.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Texts sent to `chat`, oldest first.
    pub fn sent_to(&self, chat: ChatId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send { message, text, .. } if message.chat == chat => Some(text),
                _ => None,
            })
            .collect()
    }

    /// The latest message sent or edited in `chat`, as a button would see it.
    pub fn last_in(&self, chat: ChatId) -> (MessageRef, String, Vec<String>) {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                Call::Send { message, text, buttons } | Call::Edit { message, text, buttons }
                    if message.chat == chat =>
                {
                    Some((message, text, buttons))
                }
                _ => None,
            })
            .unwrap_or_else(|| panic!("nothing sent to {chat}"))
    }

    pub fn edits(&self) -> Vec<(MessageRef, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Edit { message, text, .. } => Some((message, text)),
                _ => None,
            })
            .collect()
    }

    pub fn restrictions(&self) -> Vec<(UserId, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Restrict {
                    user, allow_posting, ..
                } => Some((user, allow_posting)),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_toast(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::Answer { text } => Some(text),
            _ => None,
        })?
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, GatewayError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                method: "sendMessage".to_owned(),
                description: "Bad Request: chat not found".to_owned(),
            });
        }
        let message = MessageRef {
            chat,
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        };
        self.calls.lock().push(Call::Send {
            message,
            text: text.to_owned(),
            buttons: button_data(&keyboard),
        });
        Ok(message)
    }

    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, GatewayError> {
        self.calls.lock().push(Call::Edit {
            message,
            text: text.to_owned(),
            buttons: button_data(&keyboard),
        });
        Ok(message)
    }

    async fn delete(&self, message: MessageRef) -> Result<(), GatewayError> {
        self.calls.lock().push(Call::Delete(message));
        Ok(())
    }

    async fn restrict_user(
        &self,
        chat: ChatId,
        user: UserId,
        allow_posting: bool,
    ) -> Result<(), GatewayError> {
        self.calls.lock().push(Call::Restrict {
            chat,
            user,
            allow_posting,
        });
        Ok(())
    }

    async fn answer_button(&self, _id: &str, text: Option<&str>) -> Result<(), GatewayError> {
        self.calls.lock().push(Call::Answer {
            text: text.map(str::to_owned),
        });
        Ok(())
    }

    async fn set_commands(
        &self,
        lang: Option<Lang>,
        commands: &[BotCommand],
    ) -> Result<(), GatewayError> {
        self.calls.lock().push(Call::SetCommands {
            lang,
            count: commands.len(),
        });
        Ok(())
    }
}

/// Replays fixed batches, then reports the source closed.
pub struct ScriptedSource(pub VecDeque<Vec<Update>>);

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<Update>>, GatewayError> {
        Ok(self.0.pop_front())
    }
}

pub fn user(id: i64, lang: &str) -> User {
    User {
        id: UserId(id),
        username: Some(format!("user{id}")),
        first_name: format!("User {id}"),
        language_code: Some(lang.to_owned()),
    }
}

pub fn private(user: &User) -> ChatId {
    ChatId(user.id.0)
}

pub struct Harness {
    pub state: AppState,
    pub gateway: Arc<RecordingGateway>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(Policy {
            rate_limit: Duration::ZERO,
            ..Policy::default()
        })
    }

    pub fn with_policy(policy: Policy) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            bot_token: "test".to_owned(),
            admin_chat: ADMIN,
            default_lang: Lang::En,
            admin_lang: Lang::En,
            data_dir: dir.path().to_path_buf(),
            poll_timeout: Duration::from_secs(1),
            policy,
        };
        let gateway = Arc::new(RecordingGateway::default());
        let state = AppState::new(&config, gateway.clone()).unwrap();
        Self {
            state,
            gateway,
            dir,
        }
    }

    pub async fn text(&self, chat: ChatId, from: &User, text: &str) {
        let kind = if chat.0 == from.id.0 {
            ChatKind::Private
        } else {
            ChatKind::Group
        };
        let message = MessageRef {
            chat,
            id: 1_000_000 + from.id.0,
        };
        let update = Update::Text {
            chat,
            kind,
            message,
            from: from.clone(),
            text: text.to_owned(),
        };
        handlers::handle(&self.state, update).await.unwrap();
    }

    /// Presses `data` on the latest message in `chat`.
    pub async fn press(&self, chat: ChatId, from: &User, data: &str) {
        let (message, text, _) = self.gateway.last_in(chat);
        self.press_on(Some((message, text)), from, data).await;
    }

    pub async fn press_on(&self, message: Option<(MessageRef, String)>, from: &User, data: &str) {
        let update = Update::ButtonPress {
            id: "cb".to_owned(),
            from: from.clone(),
            message,
            data: Some(data.to_owned()),
            short_tag: None,
        };
        handlers::handle(&self.state, update).await.unwrap();
    }
}
