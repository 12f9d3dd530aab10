//! Who still has to prove they belong here, and how far along the quiz
//! they are.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::gateway::UserId;
use crate::store::JsonFile;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDoc {
    #[serde(default)]
    user_correct: HashMap<UserId, u32>,
    #[serde(default)]
    is_newbie: HashMap<UserId, bool>,
    /// Index of the question each quiz taker is expected to answer next.
    #[serde(default)]
    quiz_cursor: HashMap<UserId, usize>,
}

pub struct VerificationState {
    doc: RwLock<StateDoc>,
    file: JsonFile,
}

impl VerificationState {
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let file = JsonFile::new(dir, "state");
        Self {
            doc: RwLock::new(file.load()),
            file,
        }
    }

    /// Resets the correct-answer count to zero and marks the user as a
    /// newbie. Safe to call again on a quiz restart.
    pub fn start_quiz(&self, user: UserId) {
        self.mutate(|doc| {
            doc.user_correct.insert(user, 0);
            doc.quiz_cursor.insert(user, 0);
            doc.is_newbie.insert(user, true);
        });
    }

    /// Takes the answer to `question` if it is the one the user is on, and
    /// moves them to the next. Repeated or out-of-order answers return
    /// false and change nothing.
    pub fn accept_answer(&self, user: UserId, question: usize, correct: bool) -> bool {
        let mut doc = self.doc.write();
        match doc.quiz_cursor.get_mut(&user) {
            Some(cursor) if *cursor == question => *cursor += 1,
            _ => return false,
        }
        if correct {
            *doc.user_correct.entry(user).or_insert(0) += 1;
        }
        self.file.save_or_log(&*doc);
        true
    }

    /// No-op for users without a running quiz.
    pub fn record_correct_answer(&self, user: UserId) {
        self.mutate(|doc| {
            if let Some(count) = doc.user_correct.get_mut(&user) {
                *count += 1;
            }
        });
    }

    pub fn total_correct(&self, user: UserId) -> u32 {
        self.doc.read().user_correct.get(&user).copied().unwrap_or(0)
    }

    pub fn is_newbie(&self, user: UserId) -> bool {
        self.doc.read().is_newbie.get(&user).copied().unwrap_or(false)
    }

    pub fn clear_newbie(&self, user: UserId) {
        self.mutate(|doc| {
            doc.is_newbie.remove(&user);
        });
    }

    /// Drops the quiz counter and position. The newbie flag is left alone.
    pub fn end_quiz(&self, user: UserId) {
        self.mutate(|doc| {
            doc.user_correct.remove(&user);
            doc.quiz_cursor.remove(&user);
        });
    }

    fn mutate(&self, f: impl FnOnce(&mut StateDoc)) {
        let mut doc = self.doc.write();
        f(&mut doc);
        self.file.save_or_log(&*doc);
    }
}
