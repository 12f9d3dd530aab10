//! Banned-phrase matching.
//!
//! A one-word phrase must equal a whole word of the message. A longer
//! phrase matches when every one of its words occurs somewhere in the
//! message text, as a substring, in any order. The multi-word rule is
//! loose on purpose and can over-match (`["buy", "now"]` hits "nowhere to
//! buy"); it is kept that way.

use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::store::JsonFile;

#[derive(Debug, Default, Serialize, Deserialize)]
struct BlacklistDoc {
    #[serde(default)]
    phrases: Vec<Vec<String>>,
}

pub struct PhraseFilter {
    doc: RwLock<BlacklistDoc>,
    file: JsonFile,
}

impl PhraseFilter {
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let file = JsonFile::new(dir, "blacklist");
        Self {
            doc: RwLock::new(file.load()),
            file,
        }
    }

    /// Appends the phrase, lowercased. Returns false for an empty phrase or
    /// one that is already listed.
    pub fn add<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        let phrase = lowercase(tokens);
        if phrase.is_empty() {
            return false;
        }
        let joined = phrase.join(" ");
        let mut doc = self.doc.write();
        if doc.phrases.iter().any(|p| p.join(" ") == joined) {
            return false;
        }
        doc.phrases.push(phrase);
        self.file.save_or_log(&*doc);
        true
    }

    /// Removes every stored phrase equal to `tokens`. Returns whether
    /// anything was removed.
    pub fn remove<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        let target = lowercase(tokens).join(" ");
        let mut doc = self.doc.write();
        let before = doc.phrases.len();
        doc.phrases.retain(|phrase| phrase.join(" ") != target);
        if doc.phrases.len() == before {
            return false;
        }
        self.file.save_or_log(&*doc);
        true
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        let words: Vec<&str> = text.split_whitespace().collect();

        self.doc.read().phrases.iter().any(|phrase| match phrase.as_slice() {
            [] => false,
            [word] => words.contains(&word.as_str()),
            tokens => tokens.iter().all(|token| text.contains(token.as_str())),
        })
    }

    pub fn list(&self) -> Vec<Vec<String>> {
        self.doc.read().phrases.clone()
    }
}

fn lowercase<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    tokens.iter().map(|t| t.as_ref().to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> (tempfile::TempDir, PhraseFilter) {
        let dir = tempfile::tempdir().unwrap();
        let filter = PhraseFilter::open(dir.path());
        (dir, filter)
    }

    #[test]
    fn single_word_matches_whole_words_only() {
        let (_dir, filter) = filter();
        filter.add(&["spam"]);

        assert!(filter.matches("buy spam now"));
        assert!(filter.matches("SPAM"));
        assert!(!filter.matches("spammer"));
    }

    #[test]
    fn multi_word_matches_in_any_order() {
        let (_dir, filter) = filter();
        filter.add(&["Buy", "now"]);

        assert!(filter.matches("now is the time to buy"));
        assert!(filter.matches("nowhere to buyer"));
        assert!(!filter.matches("buy later"));
    }

    #[test]
    fn remove_needs_exact_sequence() {
        let (_dir, filter) = filter();
        filter.add(&["buy", "now"]);

        assert!(!filter.remove(&["now", "buy"]));
        assert!(filter.remove(&["BUY", "NOW"]));
        assert!(filter.list().is_empty());
        assert!(!filter.remove(&["buy", "now"]));
    }

    #[test]
    fn duplicates_are_not_stored_twice() {
        let (_dir, filter) = filter();
        assert!(filter.add(&["spam"]));
        assert!(!filter.add(&["SPAM"]));
        assert!(!filter.add::<&str>(&[]));
        assert_eq!(filter.list().len(), 1);

        assert!(filter.add(&["buy", "now"]));
        assert!(!filter.add(&["buy now"]), "same phrase once joined");
        assert_eq!(filter.list().len(), 2);
    }

    #[test]
    fn phrases_persist() {
        let dir = tempfile::tempdir().unwrap();
        PhraseFilter::open(dir.path()).add(&["casino"]);

        let reopened = PhraseFilter::open(dir.path());
        assert_eq!(reopened.list(), vec![vec!["casino".to_owned()]]);
        assert!(reopened.matches("best casino in town"));
    }
}
