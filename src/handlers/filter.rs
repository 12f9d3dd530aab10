use crate::{AppResult, AppState};

use super::{best_effort, log_to_admin, notice, Incoming, NOTICE_TTL};

/// Removes a message containing a banned phrase and escalates: a warning
/// each time, loss of posting rights at the mute threshold.
///
/// Returns whether the message was caught.
pub(super) async fn check(state: &AppState, incoming: &Incoming, text: &str) -> AppResult<bool> {
    if !state.filter.matches(text) {
        return Ok(false);
    }

    let user = &incoming.from;
    let count = state.violations.increment(user.id);
    tracing::info!(user_id = %user.id, chat_id = %incoming.chat, count, "banned phrase");

    best_effort("delete offending message", state.gateway.delete(incoming.message).await);

    let warning = state
        .l10n
        .tf(incoming.lang, "filter.warning", &[("user", &user.display_name())]);
    notice(state, incoming.chat, &warning, NOTICE_TTL).await;

    let count_text = count.to_string();
    let audit = state.l10n.tf(
        state.admin_lang,
        "audit.banned_phrase",
        &[
            ("user", &user.audit_name()),
            ("count", &count_text),
            ("text", text),
        ],
    );
    log_to_admin(state, &audit).await;

    if count >= state.policy.mute_threshold {
        tracing::warn!(user_id = %user.id, count, "muting repeat offender");
        best_effort(
            "mute",
            state.gateway.restrict_user(incoming.chat, user.id, false).await,
        );
        let muted = state
            .l10n
            .tf(incoming.lang, "filter.muted", &[("user", &user.display_name())]);
        notice(state, incoming.chat, &muted, NOTICE_TTL).await;

        let audit = state.l10n.tf(
            state.admin_lang,
            "audit.muted",
            &[("user", &user.audit_name()), ("count", &count_text)],
        );
        log_to_admin(state, &audit).await;
    }
    Ok(true)
}
