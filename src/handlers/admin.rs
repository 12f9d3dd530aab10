//! Blacklist management, only from the moderation channel.

use crate::AppState;

use super::{notice, reply, Incoming, NOTICE_TTL};

/// Replies with the "admin only" notice outside the moderation channel.
async fn in_admin_chat(state: &AppState, incoming: &Incoming) -> bool {
    if incoming.chat == state.admin_chat {
        return true;
    }
    let text = state.l10n.t(incoming.lang, "admin.admin_only");
    notice(state, incoming.chat, text, NOTICE_TTL).await;
    false
}

pub(super) async fn ban(state: &AppState, incoming: &Incoming, args: &str) {
    if !in_admin_chat(state, incoming).await {
        return;
    }
    let lang = state.admin_lang;
    let tokens: Vec<&str> = args.split_whitespace().collect();
    if tokens.is_empty() {
        reply(state, incoming.chat, state.l10n.t(lang, "admin.ban_usage"), None).await;
        return;
    }

    let phrase = tokens.join(" ").to_lowercase();
    let key = if state.filter.add(&tokens) {
        tracing::info!(admin = %incoming.from.id, %phrase, "banned phrase added");
        "admin.ban_added"
    } else {
        "admin.ban_exists"
    };
    let text = state.l10n.tf(lang, key, &[("phrase", &phrase)]);
    reply(state, incoming.chat, &text, None).await;
}

pub(super) async fn unban(state: &AppState, incoming: &Incoming, args: &str) {
    if !in_admin_chat(state, incoming).await {
        return;
    }
    let lang = state.admin_lang;
    let tokens: Vec<&str> = args.split_whitespace().collect();
    if tokens.is_empty() {
        reply(state, incoming.chat, state.l10n.t(lang, "admin.unban_usage"), None).await;
        return;
    }

    let phrase = tokens.join(" ").to_lowercase();
    let key = if state.filter.remove(&tokens) {
        tracing::info!(admin = %incoming.from.id, %phrase, "banned phrase removed");
        "admin.unban_removed"
    } else {
        "admin.unban_not_found"
    };
    let text = state.l10n.tf(lang, key, &[("phrase", &phrase)]);
    reply(state, incoming.chat, &text, None).await;
}

pub(super) async fn list(state: &AppState, incoming: &Incoming) {
    if !in_admin_chat(state, incoming).await {
        return;
    }
    let lang = state.admin_lang;
    let phrases = state.filter.list();
    let text = if phrases.is_empty() {
        state.l10n.t(lang, "admin.list_empty").to_owned()
    } else {
        let lines: Vec<String> = phrases
            .iter()
            .enumerate()
            .map(|(i, tokens)| format!("{}. {}", i + 1, tokens.join(" ")))
            .collect();
        format!("{}\n{}", state.l10n.t(lang, "admin.list_header"), lines.join("\n"))
    };
    reply(state, incoming.chat, &text, None).await;
}
