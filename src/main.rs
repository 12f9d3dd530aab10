use std::sync::Arc;
use std::time::Duration;

use capyguard::config::Config;
use capyguard::handlers;
use capyguard::telegram::{LongPoller, TelegramGateway};
use capyguard::{AppResult, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("bad configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = serve(config).await {
        tracing::error!("bot stopped: {e}");
        std::process::exit(1);
    }
}

async fn serve(config: Config) -> AppResult<()> {
    // requests must outlive the long poll they carry
    let api = TelegramGateway::new(&config.bot_token, config.poll_timeout + Duration::from_secs(10))?;
    let state = AppState::new(&config, Arc::new(api.clone()))?;

    tracing::info!(
        admin_chat = %config.admin_chat,
        data_dir = %config.data_dir.display(),
        default_lang = %config.default_lang,
        "starting"
    );
    handlers::publish_commands(&state).await;
    handlers::run(LongPoller::new(api, config.poll_timeout), state).await;
    Ok(())
}
