use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::gateway::ChatId;
use crate::i18n::Lang;
use crate::AppResult;

/// Tunable moderation constants.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    /// Correct answers out of the three quiz questions needed to pass.
    pub quiz_pass_threshold: u32,
    /// Minimum gap between rate-limited commands from one user.
    pub rate_limit: Duration,
    /// Violation count at which a user loses posting rights.
    pub mute_threshold: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            quiz_pass_threshold: 2,
            rate_limit: Duration::from_millis(1000),
            mute_threshold: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_chat: ChatId,
    pub default_lang: Lang,
    pub admin_lang: Lang,
    pub data_dir: PathBuf,
    pub poll_timeout: Duration,
    pub policy: Policy,
}

impl Config {
    /// Reads `.env` if there is one, then the process environment.
    pub fn from_env() -> AppResult<Config> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> AppResult<Config> {
        let bot_token = var("BOT_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .ok_or("BOT_TOKEN is not set")?;
        let admin_chat = var("ADMIN_CHAT_ID")
            .ok_or("ADMIN_CHAT_ID is not set")?
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("ADMIN_CHAT_ID is not a chat id: {e}"))?;

        let defaults = Policy::default();
        let policy = Policy {
            quiz_pass_threshold: optional(&var, "QUIZ_PASS_THRESHOLD", defaults.quiz_pass_threshold),
            rate_limit: Duration::from_millis(optional(
                &var,
                "RATE_LIMIT_MS",
                defaults.rate_limit.as_millis() as u64,
            )),
            mute_threshold: optional(&var, "VIOLATION_MUTE_THRESHOLD", defaults.mute_threshold),
        };

        Ok(Config {
            bot_token,
            admin_chat: ChatId(admin_chat),
            default_lang: optional(&var, "DEFAULT_LANG", Lang::Pl),
            admin_lang: optional(&var, "ADMIN_LANG", Lang::Ru),
            data_dir: var("DATA_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            poll_timeout: Duration::from_secs(optional(&var, "POLL_TIMEOUT_SECS", 10)),
            policy,
        })
    }
}

fn optional<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    let Some(raw) = var(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, ?default, "ignoring invalid setting");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> AppResult<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_fill_optional_keys() {
        let config = config(&[("BOT_TOKEN", "t"), ("ADMIN_CHAT_ID", "-100")]).unwrap();
        assert_eq!(config.admin_chat, ChatId(-100));
        assert_eq!(config.default_lang, Lang::Pl);
        assert_eq!(config.admin_lang, Lang::Ru);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.policy.quiz_pass_threshold, 2);
        assert_eq!(config.policy.rate_limit, Duration::from_secs(1));
    }

    #[test]
    fn required_keys_are_required() {
        assert!(config(&[("ADMIN_CHAT_ID", "1")]).is_err());
        assert!(config(&[("BOT_TOKEN", "t")]).is_err());
        assert!(config(&[("BOT_TOKEN", "t"), ("ADMIN_CHAT_ID", "admins")]).is_err());
    }

    #[test]
    fn bad_optional_values_fall_back() {
        let config = config(&[
            ("BOT_TOKEN", "t"),
            ("ADMIN_CHAT_ID", "1"),
            ("DEFAULT_LANG", "klingon"),
            ("ADMIN_LANG", "en"),
            ("RATE_LIMIT_MS", "fast"),
            ("VIOLATION_MUTE_THRESHOLD", "5"),
        ])
        .unwrap();
        assert_eq!(config.default_lang, Lang::Pl);
        assert_eq!(config.admin_lang, Lang::En);
        assert_eq!(config.policy.rate_limit, Duration::from_secs(1));
        assert_eq!(config.policy.mute_threshold, 5);
    }
}
