//! Update dispatch.
//!
//! [`run`] spawns one task per update. Handlers talk to the stores through
//! their own locked operations and never hold a lock across a gateway call.

mod admin;
mod commands;
mod filter;
mod rating;
mod welcome;

use std::time::Duration;

use tokio::task::JoinSet;

use crate::action::Action;
use crate::gateway::{
    ChatId, ChatKind, GatewayError, Keyboard, MessageRef, Update, UpdateSource, User,
};
use crate::i18n::Lang;
use crate::{AppResult, AppState};

pub use commands::{command_menu, publish_commands};

/// How long short-lived notices stay in group chats.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);
const SOURCE_RETRY: Duration = Duration::from_secs(3);

/// A text message, with the sender's language already resolved.
pub(crate) struct Incoming {
    pub chat: ChatId,
    pub kind: ChatKind,
    pub message: MessageRef,
    pub from: User,
    pub lang: Lang,
}

impl Incoming {
    pub fn is_private(&self) -> bool {
        self.kind == ChatKind::Private
    }
}

/// A button press. `message` is the one the button sits on, with its text.
pub(crate) struct Press {
    pub from: User,
    pub message: Option<(MessageRef, String)>,
    pub lang: Lang,
}

/// Pulls updates until the source runs dry, one task per update.
pub async fn run<S: UpdateSource>(mut source: S, state: AppState) {
    let mut tasks = JoinSet::new();
    loop {
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                tracing::error!("update task panicked: {e}");
            }
        }

        match source.next_batch().await {
            Ok(Some(batch)) => {
                for update in batch {
                    let state = state.clone();
                    tasks.spawn(async move {
                        if let Err(e) = handle(&state, update).await {
                            tracing::error!("failed to handle update: {e}");
                        }
                    });
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!("failed to fetch updates: {e}");
                tokio::time::sleep(SOURCE_RETRY).await;
            }
        }
    }

    while let Some(done) = tasks.join_next().await {
        if let Err(e) = done {
            tracing::error!("update task panicked: {e}");
        }
    }
    tracing::info!("update source closed");
}

pub async fn handle(state: &AppState, update: Update) -> AppResult<()> {
    match update {
        Update::UserJoined { chat, users } => welcome::on_join(state, chat, users).await,
        Update::UserLeft { chat, user } => welcome::on_leave(state, chat, user).await,
        Update::Text {
            chat,
            kind,
            message,
            from,
            text,
        } => {
            let lang = state.l10n.lang_for(from.language_code.as_deref());
            let incoming = Incoming {
                chat,
                kind,
                message,
                from,
                lang,
            };
            on_text(state, &incoming, &text).await
        }
        Update::ButtonPress {
            id,
            from,
            message,
            data,
            short_tag,
        } => {
            let action = Action::parse(data.as_deref(), short_tag.as_deref());
            let lang = state.l10n.lang_for(from.language_code.as_deref());
            let press = Press {
                from,
                message,
                lang,
            };
            tracing::debug!(user_id = %press.from.id, %action, "button pressed");

            let toast = match on_button(state, &press, action).await {
                Ok(toast) => toast,
                Err(e) => {
                    tracing::error!(user_id = %press.from.id, "failed to handle button: {e}");
                    None
                }
            };
            state.gateway.answer_button(&id, toast.as_deref()).await?;
            Ok(())
        }
    }
}

async fn on_text(state: &AppState, incoming: &Incoming, text: &str) -> AppResult<()> {
    if let Some((command, args)) = parse_command(text) {
        if commands::handle(state, incoming, command, args).await? {
            return Ok(());
        }
    }

    if incoming.is_private() {
        rating::on_private_text(state, incoming, text).await?;
        return Ok(());
    }

    if incoming.chat != state.admin_chat {
        filter::check(state, incoming, text).await?;
    }
    Ok(())
}

/// Returns the toast to show on the pressed button, if any.
async fn on_button(state: &AppState, press: &Press, action: Action) -> AppResult<Option<String>> {
    match action {
        Action::Welcome { user, choice } => welcome::on_choice(state, press, user, choice).await,
        Action::QuizAnswer {
            user,
            question,
            choice,
        } => welcome::on_answer(state, press, user, question, choice).await,
        Action::Unrecognized => Ok(None),
        rating_action => rating::on_button(state, press, rating_action).await,
    }
}

/// Splits `/cmd@bot args` into `("cmd", "args")`.
pub(crate) fn parse_command(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start().strip_prefix('/')?;
    let (head, args) = text
        .split_once(char::is_whitespace)
        .unwrap_or((text, ""));
    let command = head.split('@').next().unwrap_or(head);
    if command.is_empty() {
        return None;
    }
    Some((command, args.trim()))
}

/// Logs a failed best-effort gateway call and carries on.
pub(crate) fn best_effort<T>(what: &str, result: Result<T, GatewayError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("{what} failed: {e}");
            None
        }
    }
}

/// Posts an audit line to the moderation channel. Failure is logged only.
pub(crate) async fn log_to_admin(state: &AppState, text: &str) {
    best_effort(
        "admin log",
        state.gateway.send(state.admin_chat, text, None).await,
    );
}

pub(crate) async fn reply(
    state: &AppState,
    chat: ChatId,
    text: &str,
    keyboard: Option<Keyboard>,
) -> Option<MessageRef> {
    best_effort("send", state.gateway.send(chat, text, keyboard).await)
}

/// Sends a message that removes itself after `ttl`.
pub(crate) async fn notice(state: &AppState, chat: ChatId, text: &str, ttl: Duration) {
    if let Some(sent) = reply(state, chat, text, None).await {
        crate::gateway::schedule_delete(state.gateway.clone(), sent, ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_lose_bot_suffix_and_keep_args() {
        assert_eq!(parse_command("/rate"), Some(("rate", "")));
        assert_eq!(parse_command("/banword@capy_bot buy  now "), Some(("banword", "buy  now")));
        assert_eq!(parse_command("  /ping\nextra"), Some(("ping", "extra")));
        assert_eq!(parse_command("hello /rate"), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("/@bot"), None);
    }
}
