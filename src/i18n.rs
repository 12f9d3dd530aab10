use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AppResult, include_res};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Pl,
    En,
    Ru,
    Uk,
    Be,
}

impl Lang {
    pub const ALL: [Lang; 5] = [Lang::Pl, Lang::En, Lang::Ru, Lang::Uk, Lang::Be];

    pub fn code(&self) -> &'static str {
        use Lang::*;
        match self {
            Pl => "pl",
            En => "en",
            Ru => "ru",
            Uk => "uk",
            Be => "be",
        }
    }

    /// Matches a declared locale such as `"en"` or `"en-US"`.
    pub fn from_code(code: &str) -> Option<Lang> {
        let code = code.trim().to_lowercase();
        if code.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .or_else(|| Self::ALL.into_iter().find(|lang| code.starts_with(lang.code())))
    }

    fn source(&self) -> &'static str {
        use Lang::*;
        match self {
            Pl => include_res!(str, "/locales/pl.toml"),
            En => include_res!(str, "/locales/en.toml"),
            Ru => include_res!(str, "/locales/ru.toml"),
            Uk => include_res!(str, "/locales/uk.toml"),
            Be => include_res!(str, "/locales/be.toml"),
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Lang::from_code(s).ok_or_else(|| format!("unsupported language {s:?}"))
    }
}

/// Resolved message sets for every language, loaded once.
#[derive(Debug)]
pub struct Localizer {
    messages: HashMap<Lang, HashMap<String, String>>,
    default: Lang,
}

impl Localizer {
    pub fn load(default: Lang) -> AppResult<Localizer> {
        let mut messages = HashMap::new();
        for lang in Lang::ALL {
            let table: toml::Table = toml::from_str(lang.source())
                .map_err(|e| format!("locale {lang}: {e}"))?;
            let mut flat = HashMap::new();
            flatten("", &table, &mut flat);
            messages.insert(lang, flat);
        }
        Ok(Localizer { messages, default })
    }

    pub fn default_lang(&self) -> Lang {
        self.default
    }

    /// Picks the user's language from their declared locale.
    pub fn lang_for(&self, code: Option<&str>) -> Lang {
        code.and_then(Lang::from_code).unwrap_or(self.default)
    }

    pub fn t<'a>(&'a self, lang: Lang, key: &'a str) -> &'a str {
        self.lookup(lang, key)
            .or_else(|| self.lookup(self.default, key))
            .unwrap_or_else(|| {
                tracing::warn!(lang = %lang, key, "missing translation");
                key
            })
    }

    /// `t` with `{name}` placeholders filled in.
    pub fn tf(&self, lang: Lang, key: &str, args: &[(&str, &str)]) -> String {
        args.iter()
            .fold(self.t(lang, key).to_owned(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }

    fn lookup(&self, lang: Lang, key: &str) -> Option<&str> {
        self.messages.get(&lang)?.get(key).map(String::as_str)
    }
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(inner) => flatten(&key, inner, out),
            other => {
                out.insert(key, other.to_string());
            }
        }
    }
}
