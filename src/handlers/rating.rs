use crate::action::Action;
use crate::gateway::{Button, ChatId, Keyboard, MessageRef, UserId};
use crate::i18n::Lang;
use crate::rating::{render, NewReview, Review, TextOutcome};
use crate::{AppResult, AppState};

use super::{best_effort, notice, reply, Incoming, Press, NOTICE_TTL};

pub const PAGE_SIZE: usize = 5;

fn cancel_row(state: &AppState, lang: Lang) -> Vec<Button> {
    vec![Button::new(
        state.l10n.t(lang, "rating.btn_cancel"),
        Action::RateCancel.encode(),
    )]
}

fn type_keyboard(state: &AppState, lang: Lang) -> Keyboard {
    vec![
        vec![
            Button::new(
                state.l10n.t(lang, "rating.btn_public"),
                Action::RateType { anonymous: false }.encode(),
            ),
            Button::new(
                state.l10n.t(lang, "rating.btn_anonymous"),
                Action::RateType { anonymous: true }.encode(),
            ),
        ],
        cancel_row(state, lang),
    ]
}

fn score_keyboard(state: &AppState, lang: Lang) -> Keyboard {
    let scores = (1..=5)
        .map(|n| Button::new(n.to_string(), Action::RateScore(n).encode()))
        .collect();
    vec![scores, cancel_row(state, lang)]
}

fn confirm_keyboard(state: &AppState, lang: Lang) -> Keyboard {
    vec![vec![
        Button::new(
            state.l10n.t(lang, "rating.btn_submit"),
            Action::RateSubmit.encode(),
        ),
        Button::new(
            state.l10n.t(lang, "rating.btn_cancel"),
            Action::RateCancel.encode(),
        ),
    ]]
}

/// `/rate`: opens a fresh submission, replacing any unfinished one.
pub(super) async fn start(state: &AppState, incoming: &Incoming) -> AppResult<()> {
    let lang = incoming.lang;
    if !incoming.is_private() {
        let text = state.l10n.t(lang, "ping.private_only");
        notice(state, incoming.chat, text, NOTICE_TTL).await;
        return Ok(());
    }

    let user = incoming.from.id;
    if state.reviews.is_blocked(user) {
        tracing::info!(user_id = %user, "blocked user tried to rate");
        reply(state, incoming.chat, state.l10n.t(lang, "rating.blocked"), None).await;
        return Ok(());
    }

    if let Some(stale) = state.sessions.begin(user) {
        best_effort("drop stale prompt", state.gateway.delete(stale).await);
    }
    let sent = state
        .gateway
        .send(
            incoming.chat,
            state.l10n.t(lang, "rating.choose_type"),
            Some(type_keyboard(state, lang)),
        )
        .await;
    let prompt = match sent {
        Ok(prompt) => prompt,
        Err(e) => {
            // without its buttons the session could never advance
            state.sessions.cancel(user);
            return Err(e.into());
        }
    };
    state.sessions.set_prompt(user, prompt);
    Ok(())
}

/// Private text that no command claimed. Feeds the pending review or
/// search, if there is one.
pub(super) async fn on_private_text(state: &AppState, incoming: &Incoming, text: &str) -> AppResult<bool> {
    let lang = incoming.lang;
    let user = incoming.from.id;
    let chat = incoming.chat;

    match state.sessions.take_text(user, text) {
        TextOutcome::NotConsumed => return Ok(false),
        TextOutcome::AwaitingButton => {}
        TextOutcome::InvalidName => {
            reply(state, chat, state.l10n.t(lang, "rating.invalid_name"), None).await;
        }
        TextOutcome::TooShort => {
            reply(state, chat, state.l10n.t(lang, "rating.review_too_short"), None).await;
        }
        TextOutcome::TooLong => {
            reply(state, chat, state.l10n.t(lang, "rating.review_too_long"), None).await;
        }
        TextOutcome::NameAccepted => {
            let keyboard = score_keyboard(state, lang);
            let prompt = state
                .gateway
                .send(chat, state.l10n.t(lang, "rating.choose_score"), Some(keyboard))
                .await?;
            replace_prompt(state, user, prompt).await;
        }
        TextOutcome::ReadyToConfirm(session) => {
            let text = render::preview(&state.l10n, lang, &session);
            let prompt = state
                .gateway
                .send(chat, &text, Some(confirm_keyboard(state, lang)))
                .await?;
            replace_prompt(state, user, prompt).await;
        }
        TextOutcome::SearchQuery(query) => {
            let (text, keyboard) = page_view(state, lang, &query, 0);
            state.gateway.send(chat, &text, Some(keyboard)).await?;
        }
    }
    Ok(true)
}

async fn replace_prompt(state: &AppState, user: UserId, prompt: MessageRef) {
    if let Some(old) = state.sessions.set_prompt(user, prompt) {
        best_effort("drop old prompt", state.gateway.delete(old).await);
    }
}

/// `/ratings`: first page of approved reviews.
pub(super) async fn list(state: &AppState, incoming: &Incoming) -> AppResult<()> {
    if !incoming.is_private() {
        let text = state.l10n.t(incoming.lang, "ping.private_only");
        notice(state, incoming.chat, text, NOTICE_TTL).await;
        return Ok(());
    }
    let (text, keyboard) = page_view(state, incoming.lang, "", 0);
    state.gateway.send(incoming.chat, &text, Some(keyboard)).await?;
    Ok(())
}

/// One page of approved reviews, or of search results when `query` is set.
fn page_view(state: &AppState, lang: Lang, query: &str, page: usize) -> (String, Keyboard) {
    let query = query.trim();
    let reviews: Vec<Review> = if query.is_empty() {
        state.reviews.approved()
    } else {
        state.reviews.search(query)
    };
    let search_row = vec![Button::new(
        state.l10n.t(lang, "rating.btn_search"),
        Action::RatingsSearch.encode(),
    )];

    if reviews.is_empty() {
        let text = if query.is_empty() {
            state.l10n.t(lang, "rating.no_reviews").to_owned()
        } else {
            state
                .l10n
                .tf(lang, "rating.no_search_results", &[("query", query)])
        };
        return (text, vec![search_row]);
    }

    let pages = reviews.len().div_ceil(PAGE_SIZE);
    let page = page.min(pages - 1);
    let cards: Vec<String> = reviews
        .iter()
        .skip(page * PAGE_SIZE)
        .take(PAGE_SIZE)
        .map(|r| render::card(&state.l10n, lang, r))
        .collect();

    let mut header = format!("📚 {} ({}/{})", state.l10n.t(lang, "rating.list_header"), page + 1, pages);
    if !query.is_empty() {
        header.push_str(&format!("\n🔍 {query}"));
    }
    let text = format!("{header}\n\n{}", cards.join("\n\n"));

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(Button::new(
            state.l10n.t(lang, "rating.btn_prev"),
            Action::RatingsPage {
                page: page - 1,
                query: query.to_owned(),
            }
            .encode(),
        ));
    }
    if page + 1 < pages {
        nav.push(Button::new(
            state.l10n.t(lang, "rating.btn_next"),
            Action::RatingsPage {
                page: page + 1,
                query: query.to_owned(),
            }
            .encode(),
        ));
    }

    let mut keyboard = Vec::new();
    if !nav.is_empty() {
        keyboard.push(nav);
    }
    keyboard.push(search_row);
    (text, keyboard)
}

/// Listing buttons only work on a message in the presser's own private
/// chat, where the search answer can reach them.
fn in_private_chat(message: Option<MessageRef>, user: UserId) -> bool {
    message.is_some_and(|m| m.chat == ChatId(user.0))
}

fn expired(state: &AppState, press: &Press) -> Option<String> {
    Some(state.l10n.t(press.lang, "rating.session_expired").to_owned())
}

/// Everything review-related that arrives as a button press.
pub(super) async fn on_button(state: &AppState, press: &Press, action: Action) -> AppResult<Option<String>> {
    let lang = press.lang;
    let user = press.from.id;
    let message = press.message.as_ref().map(|(m, _)| *m);

    match action {
        Action::RateCancel => {
            if !state.sessions.cancel(user) {
                return Ok(expired(state, press));
            }
            tracing::debug!(user_id = %user, "review cancelled");
            if let Some(message) = message {
                state
                    .gateway
                    .edit(message, state.l10n.t(lang, "rating.cancelled"), None)
                    .await?;
            }
        }
        Action::RateType { anonymous } => {
            if !state.sessions.choose_type(user, anonymous) {
                return Ok(expired(state, press));
            }
            if let Some(message) = message {
                let keyboard = vec![cancel_row(state, lang)];
                state
                    .gateway
                    .edit(message, state.l10n.t(lang, "rating.enter_name"), Some(keyboard))
                    .await?;
            }
        }
        Action::RateScore(score) => {
            if !state.sessions.choose_score(user, score) {
                return Ok(expired(state, press));
            }
            if let Some(message) = message {
                let keyboard = vec![cancel_row(state, lang)];
                state
                    .gateway
                    .edit(message, state.l10n.t(lang, "rating.enter_review"), Some(keyboard))
                    .await?;
            }
        }
        Action::RateSubmit => return submit(state, press, message).await,
        Action::Admin { decision, review } => {
            let Some((admin_message, text)) = press.message.clone() else {
                return Ok(None);
            };
            if admin_message.chat != state.admin_chat {
                return Ok(Some(state.l10n.t(lang, "admin.admin_only").to_owned()));
            }
            tracing::info!(admin = %user, review_id = review, ?decision, "moderation decision");
            state
                .router
                .resolve(review, decision, Some((admin_message, text)))
                .await;
        }
        Action::RatingsPage { .. } | Action::RatingsSearch if !in_private_chat(message, user) => {
            return Ok(Some(state.l10n.t(lang, "ping.private_only").to_owned()));
        }
        Action::RatingsPage { page, query } => {
            if let Some(message) = message {
                let (text, keyboard) = page_view(state, lang, &query, page);
                state.gateway.edit(message, &text, Some(keyboard)).await?;
            }
        }
        Action::RatingsSearch => {
            state.sessions.await_search(user);
            reply(state, ChatId(user.0), state.l10n.t(lang, "rating.search_prompt"), None).await;
        }
        Action::Welcome { .. } | Action::QuizAnswer { .. } | Action::Unrecognized => {}
    }
    Ok(None)
}

/// Confirm step: the review is stored and sent for moderation exactly
/// once, however often the button is pressed.
async fn submit(state: &AppState, press: &Press, message: Option<MessageRef>) -> AppResult<Option<String>> {
    let lang = press.lang;
    let user = &press.from;
    let Some(session) = state.sessions.submit(user.id) else {
        return Ok(expired(state, press));
    };

    if state.reviews.is_blocked(user.id) {
        if let Some(message) = message {
            state
                .gateway
                .edit(message, state.l10n.t(lang, "rating.blocked"), None)
                .await?;
        }
        return Ok(None);
    }

    let review = state.reviews.append(NewReview {
        author_id: user.id,
        display_name: user.display_name(),
        is_anonymous: session.anonymous,
        subject_name: session.subject_name,
        score: session.score,
        text: session.text,
        lang: Some(lang),
    });
    tracing::info!(user_id = %user.id, review_id = review.id, "review submitted");

    if let Some(message) = message {
        best_effort(
            "confirm submission",
            state
                .gateway
                .edit(message, state.l10n.t(lang, "rating.submitted"), None)
                .await,
        );
    }
    best_effort("dispatch review", state.router.dispatch(&review).await);
    Ok(None)
}
