//! Join greeting, the student quiz and the guest/ads opt-outs.
//!
//! A newcomer is restricted and marked as a newbie on join. Only passing
//! the quiz or choosing the guest path gives posting rights back.

use std::time::Duration;

use crate::action::{Action, WelcomeChoice};
use crate::gateway::{schedule_delete, Button, ChatId, Keyboard, MessageRef, User, UserId};
use crate::i18n::Lang;
use crate::moderation::quiz;
use crate::{AppResult, AppState};

use super::{best_effort, log_to_admin, Press, NOTICE_TTL};

const GREETING_TTL: Duration = Duration::from_secs(5 * 60);
const ADS_TTL: Duration = Duration::from_secs(10);

pub(super) async fn on_join(state: &AppState, chat: ChatId, users: Vec<User>) -> AppResult<()> {
    if chat == state.admin_chat {
        return Ok(());
    }

    for user in users {
        state.verification.start_quiz(user.id);
        tracing::info!(user_id = %user.id, chat_id = %chat, "member joined");
        best_effort(
            "restrict newcomer",
            state.gateway.restrict_user(chat, user.id, false).await,
        );

        let lang = state.l10n.lang_for(user.language_code.as_deref());
        let greeting = match &user.username {
            Some(username) if !username.is_empty() => {
                state
                    .l10n
                    .tf(lang, "welcome.greeting_with_username", &[("username", username)])
            }
            _ => state.l10n.t(lang, "welcome.greeting").to_owned(),
        };
        let text = format!("{greeting}\n\n{}", state.l10n.t(lang, "welcome.choose_option"));
        let keyboard = choice_keyboard(state, lang, user.id);
        if let Some(sent) = best_effort("greet", state.gateway.send(chat, &text, Some(keyboard)).await) {
            schedule_delete(state.gateway.clone(), sent, GREETING_TTL);
        }

        let audit = state
            .l10n
            .tf(state.admin_lang, "audit.user_joined", &[("user", &user.audit_name())]);
        log_to_admin(state, &audit).await;
    }
    Ok(())
}

pub(super) async fn on_leave(state: &AppState, chat: ChatId, user: User) -> AppResult<()> {
    if chat == state.admin_chat {
        return Ok(());
    }
    state.verification.clear_newbie(user.id);
    state.verification.end_quiz(user.id);
    state.violations.clear(user.id);
    tracing::info!(user_id = %user.id, chat_id = %chat, "member left");

    let audit = state
        .l10n
        .tf(state.admin_lang, "audit.user_left", &[("user", &user.audit_name())]);
    log_to_admin(state, &audit).await;
    Ok(())
}

fn choice_keyboard(state: &AppState, lang: Lang, user: UserId) -> Keyboard {
    [
        ("buttons.student", WelcomeChoice::Student),
        ("buttons.guest", WelcomeChoice::Guest),
        ("buttons.ads", WelcomeChoice::Ads),
    ]
    .into_iter()
    .map(|(key, choice)| {
        vec![Button::new(
            state.l10n.t(lang, key),
            Action::Welcome { user, choice }.encode(),
        )]
    })
    .collect()
}

fn question_view(state: &AppState, lang: Lang, user: UserId, question: usize) -> (String, Keyboard) {
    let q = &quiz::DECK[question];
    let keyboard = q
        .options
        .iter()
        .enumerate()
        .map(|(choice, label)| {
            vec![Button::new(
                *label,
                Action::QuizAnswer {
                    user,
                    question,
                    choice,
                }
                .encode(),
            )]
        })
        .collect();
    (state.l10n.t(lang, q.key).to_owned(), keyboard)
}

/// The buttons under a greeting or quiz belong to one newcomer.
fn owns_button(state: &AppState, press: &Press, target: UserId) -> bool {
    press.from.id == target && state.verification.is_newbie(target)
}

/// Refuses the press. Someone pressing another member's button is also
/// reported to the admin chat.
async fn not_yours(state: &AppState, press: &Press, owner: UserId) -> Option<String> {
    if press.from.id != owner {
        tracing::info!(user_id = %press.from.id, owner = %owner, "foreign button pressed");
        let audit = state.l10n.tf(
            state.admin_lang,
            "audit.foreign_button",
            &[("user", &press.from.audit_name()), ("owner", &owner.to_string())],
        );
        log_to_admin(state, &audit).await;
    }
    Some(state.l10n.t(press.lang, "buttons.not_your_button").to_owned())
}

pub(super) async fn on_choice(
    state: &AppState,
    press: &Press,
    target: UserId,
    choice: WelcomeChoice,
) -> AppResult<Option<String>> {
    if !owns_button(state, press, target) {
        return Ok(not_yours(state, press, target).await);
    }
    let Some((message, _)) = &press.message else {
        return Ok(None);
    };
    let user = &press.from;
    let lang = press.lang;

    match choice {
        WelcomeChoice::Student => {
            state.verification.start_quiz(user.id);
            let (text, keyboard) = question_view(state, lang, user.id, 0);
            state.gateway.edit(*message, &text, Some(keyboard)).await?;
        }
        WelcomeChoice::Guest => {
            state.verification.clear_newbie(user.id);
            state.verification.end_quiz(user.id);
            tracing::info!(user_id = %user.id, "guest opted out of the quiz");
            best_effort(
                "lift restriction",
                state.gateway.restrict_user(message.chat, user.id, true).await,
            );
            conclude(state, *message, state.l10n.t(lang, "guest.can_write"), NOTICE_TTL).await;

            let audit = state
                .l10n
                .tf(state.admin_lang, "audit.guest_chosen", &[("user", &user.audit_name())]);
            log_to_admin(state, &audit).await;
        }
        WelcomeChoice::Ads => {
            conclude(state, *message, state.l10n.t(lang, "ads.message"), ADS_TTL).await;
            let audit = state
                .l10n
                .tf(state.admin_lang, "audit.ads_chosen", &[("user", &user.audit_name())]);
            log_to_admin(state, &audit).await;
        }
    }
    Ok(None)
}

pub(super) async fn on_answer(
    state: &AppState,
    press: &Press,
    target: UserId,
    question: usize,
    choice: usize,
) -> AppResult<Option<String>> {
    if !owns_button(state, press, target) {
        return Ok(not_yours(state, press, target).await);
    }
    let Some((message, _)) = &press.message else {
        return Ok(None);
    };
    if question >= quiz::DECK.len() {
        return Ok(None);
    }
    let user = &press.from;
    let lang = press.lang;

    let right = quiz::is_correct(question, choice);
    if !state.verification.accept_answer(user.id, question, right) {
        tracing::debug!(user_id = %user.id, question, "stale quiz answer ignored");
        return Ok(None);
    }
    if !quiz::is_last(question) {
        let (text, keyboard) = question_view(state, lang, user.id, question + 1);
        state.gateway.edit(*message, &text, Some(keyboard)).await?;
        return Ok(None);
    }

    let correct = state.verification.total_correct(user.id);
    state.verification.end_quiz(user.id);
    let passed = quiz::passed(correct, state.policy.quiz_pass_threshold);
    tracing::info!(user_id = %user.id, correct, passed, "quiz finished");

    let (result_key, audit_key) = if passed {
        state.verification.clear_newbie(user.id);
        best_effort(
            "lift restriction",
            state.gateway.restrict_user(message.chat, user.id, true).await,
        );
        ("quiz.verification_passed", "audit.verification_passed")
    } else {
        ("quiz.verification_failed", "audit.verification_failed")
    };
    conclude(state, *message, state.l10n.t(lang, result_key), NOTICE_TTL).await;

    let audit = state.l10n.tf(
        state.admin_lang,
        audit_key,
        &[
            ("user", &user.audit_name()),
            ("correct", &correct.to_string()),
            ("total", &quiz::DECK.len().to_string()),
        ],
    );
    log_to_admin(state, &audit).await;
    Ok(None)
}

/// Replaces the greeting with a final notice that expires after `ttl`.
async fn conclude(state: &AppState, message: MessageRef, text: &str, ttl: Duration) {
    if best_effort("edit greeting", state.gateway.edit(message, text, None).await).is_some() {
        schedule_delete(state.gateway.clone(), message, ttl);
    }
}
