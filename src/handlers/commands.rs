use std::time::Instant;

use crate::gateway::BotCommand;
use crate::i18n::{Lang, Localizer};
use crate::{AppResult, AppState};

use super::{admin, best_effort, log_to_admin, notice, rating, reply, Incoming, NOTICE_TTL};

const MENU: [(&str, &str); 8] = [
    ("start", "commands.start_desc"),
    ("ping", "commands.ping_desc"),
    ("version", "commands.version_desc"),
    ("rate", "commands.rate_desc"),
    ("ratings", "commands.ratings_desc"),
    ("banword", "commands.banword_desc"),
    ("unbanword", "commands.unbanword_desc"),
    ("listbanword", "commands.listbanword_desc"),
];

pub fn command_menu(l10n: &Localizer, lang: Lang) -> Vec<BotCommand> {
    MENU.iter()
        .map(|(command, key)| BotCommand {
            command: (*command).to_owned(),
            description: l10n.t(lang, key).to_owned(),
        })
        .collect()
}

/// Publishes the command menu for every language, plus the default one.
pub async fn publish_commands(state: &AppState) {
    let default = state.l10n.default_lang();
    best_effort(
        "set default commands",
        state
            .gateway
            .set_commands(None, &command_menu(&state.l10n, default))
            .await,
    );
    for lang in Lang::ALL {
        let menu = command_menu(&state.l10n, lang);
        if best_effort("set commands", state.gateway.set_commands(Some(lang), &menu).await).is_some() {
            tracing::debug!(%lang, "command menu published");
        }
    }
}

/// Returns false for commands this bot does not know.
pub(super) async fn handle(
    state: &AppState,
    incoming: &Incoming,
    command: &str,
    args: &str,
) -> AppResult<bool> {
    let rate_limited = matches!(command, "ping" | "rate" | "ratings");
    if rate_limited && !state.limiter.check(incoming.from.id) {
        too_fast(state, incoming, command).await;
        return Ok(true);
    }

    match command {
        "start" => start(state, incoming).await,
        "ping" => ping(state, incoming).await?,
        "version" => version(state, incoming).await,
        "rate" => rating::start(state, incoming).await?,
        "ratings" => rating::list(state, incoming).await?,
        "banword" => admin::ban(state, incoming, args).await,
        "unbanword" => admin::unban(state, incoming, args).await,
        "listbanword" => admin::list(state, incoming).await,
        _ => return Ok(false),
    }
    Ok(true)
}

async fn too_fast(state: &AppState, incoming: &Incoming, command: &str) {
    tracing::info!(user_id = %incoming.from.id, command, "rate limited");
    let text = state.l10n.t(incoming.lang, "ratelimit.too_fast");
    notice(state, incoming.chat, text, NOTICE_TTL).await;

    let audit = state.l10n.tf(
        state.admin_lang,
        "audit.rate_limited",
        &[
            ("user", &incoming.from.audit_name()),
            ("command", &format!("/{command}")),
        ],
    );
    log_to_admin(state, &audit).await;
}

async fn start(state: &AppState, incoming: &Incoming) {
    if !incoming.is_private() {
        return;
    }
    let text = state.l10n.t(incoming.lang, "start.greeting");
    reply(state, incoming.chat, text, None).await;
}

async fn ping(state: &AppState, incoming: &Incoming) -> AppResult<()> {
    if !incoming.is_private() {
        let text = state.l10n.t(incoming.lang, "ping.private_only");
        notice(state, incoming.chat, text, NOTICE_TTL).await;
        return Ok(());
    }

    let started = Instant::now();
    let sent = state
        .gateway
        .send(incoming.chat, state.l10n.t(incoming.lang, "ping.pong"), None)
        .await?;
    let ms = started.elapsed().as_millis().to_string();
    let text = state
        .l10n
        .tf(incoming.lang, "ping.pong_with_ms", &[("ms", &ms)]);
    state.gateway.edit(sent, &text, None).await?;
    Ok(())
}

async fn version(state: &AppState, incoming: &Incoming) {
    let text = state.l10n.tf(
        incoming.lang,
        "version.info",
        &[("version", env!("CARGO_PKG_VERSION"))],
    );
    reply(state, incoming.chat, &text, None).await;
}
