pub mod action;
pub mod config;
pub mod gateway;
pub mod handlers;
pub mod i18n;
pub mod moderation;
pub mod rating;
pub mod res;
pub mod store;
pub mod telegram;

use std::sync::Arc;

use config::{Config, Policy};
use gateway::{ChatId, Gateway};
use i18n::{Lang, Localizer};
use moderation::{PhraseFilter, RateLimiter, VerificationState, ViolationTracker};
use rating::{ModerationRouter, ReviewStore, SessionManager};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub l10n: Arc<Localizer>,
    pub verification: Arc<VerificationState>,
    pub filter: Arc<PhraseFilter>,
    pub violations: Arc<ViolationTracker>,
    pub reviews: Arc<ReviewStore>,
    pub sessions: Arc<SessionManager>,
    pub router: Arc<ModerationRouter>,
    pub limiter: Arc<RateLimiter>,
    pub policy: Policy,
    pub admin_chat: ChatId,
    pub admin_lang: Lang,
}

impl AppState {
    /// Opens every store under `config.data_dir` and wires them to `gateway`.
    pub fn new(config: &Config, gateway: Arc<dyn Gateway>) -> AppResult<Self> {
        let l10n = Arc::new(Localizer::load(config.default_lang)?);
        let dir = &config.data_dir;
        let reviews = Arc::new(ReviewStore::open(dir));
        let router = Arc::new(ModerationRouter::new(
            gateway.clone(),
            reviews.clone(),
            l10n.clone(),
            config.admin_chat,
            config.admin_lang,
        ));

        Ok(AppState {
            verification: Arc::new(VerificationState::open(dir)),
            filter: Arc::new(PhraseFilter::open(dir)),
            violations: Arc::new(ViolationTracker::open(dir)),
            sessions: Arc::new(SessionManager::new()),
            limiter: Arc::new(RateLimiter::new(config.policy.rate_limit)),
            policy: config.policy,
            admin_chat: config.admin_chat,
            admin_lang: config.admin_lang,
            gateway,
            l10n,
            reviews,
            router,
        })
    }
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(serde_json::Error);
apperr_impl!(std::io::Error);
apperr_impl!(reqwest::Error);
apperr_impl!(toml::de::Error);
apperr_impl!(store::StoreError);
apperr_impl!(gateway::GatewayError);
