//! Per-user dialogue state for review submission and ratings search.
//!
//! A user either has nothing pending (no map entry), a review in progress,
//! or an open search prompt. Every transition runs under the map lock and
//! hands back whatever the caller needs to talk to the user afterwards, so
//! no network call ever happens with the lock held.
//!
//! ```text
//! (none) --begin--> ChooseType --type--> EnterName --name--> ChooseScore
//!     --score--> EnterReview --text--> Confirm --submit--> (none)
//! any step --cancel--> (none)
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;

use crate::gateway::{MessageRef, UserId};

pub const MIN_REVIEW_CHARS: usize = 10;
pub const MAX_REVIEW_CHARS: usize = 1000;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-zĄĆĘŁŃÓŚŹŻąćęłńóśźż]+\s+[A-Za-zĄĆĘŁŃÓŚŹŻąćęłńóśźż]+$")
        .expect("name pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ChooseType,
    EnterName,
    ChooseScore,
    EnterReview,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingSession {
    pub step: Step,
    pub anonymous: bool,
    pub subject_name: String,
    pub score: u8,
    pub text: String,
    /// The bot message currently showing this session's buttons.
    pub prompt: Option<MessageRef>,
}

impl RatingSession {
    fn new() -> Self {
        Self {
            step: Step::ChooseType,
            anonymous: false,
            subject_name: String::new(),
            score: 0,
            text: String::new(),
            prompt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingInput {
    Rating(RatingSession),
    SearchQuery,
}

/// What became of a private text message offered to the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    /// Nothing pending; the text is someone else's problem.
    NotConsumed,
    /// The session is waiting for a button, not text.
    AwaitingButton,
    InvalidName,
    NameAccepted,
    TooShort,
    TooLong,
    /// The review text was taken; here is the session to preview.
    ReadyToConfirm(RatingSession),
    SearchQuery(String),
}

#[derive(Default)]
pub struct SessionManager {
    pending: Mutex<HashMap<UserId, PendingInput>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh review, replacing anything pending. Returns the
    /// prompt of a replaced review, whose buttons are now stale.
    pub fn begin(&self, user: UserId) -> Option<MessageRef> {
        match self
            .pending
            .lock()
            .insert(user, PendingInput::Rating(RatingSession::new()))
        {
            Some(PendingInput::Rating(old)) => old.prompt,
            _ => None,
        }
    }

    pub fn await_search(&self, user: UserId) {
        self.pending.lock().insert(user, PendingInput::SearchQuery);
    }

    pub fn step(&self, user: UserId) -> Option<Step> {
        match self.pending.lock().get(&user) {
            Some(PendingInput::Rating(session)) => Some(session.step),
            _ => None,
        }
    }

    pub fn is_awaiting_search(&self, user: UserId) -> bool {
        matches!(self.pending.lock().get(&user), Some(PendingInput::SearchQuery))
    }

    /// Records the message now carrying the session's buttons and returns
    /// the one it supersedes.
    pub fn set_prompt(&self, user: UserId, prompt: MessageRef) -> Option<MessageRef> {
        match self.pending.lock().get_mut(&user) {
            Some(PendingInput::Rating(session)) => session.prompt.replace(prompt),
            _ => None,
        }
    }

    pub fn choose_type(&self, user: UserId, anonymous: bool) -> bool {
        self.advance(user, Step::ChooseType, |session| {
            session.anonymous = anonymous;
            session.step = Step::EnterName;
        })
    }

    pub fn choose_score(&self, user: UserId, score: u8) -> bool {
        if !(1..=5).contains(&score) {
            return false;
        }
        self.advance(user, Step::ChooseScore, |session| {
            session.score = score;
            session.step = Step::EnterReview;
        })
    }

    /// Offers a private text message to whatever is pending for `user`.
    pub fn take_text(&self, user: UserId, text: &str) -> TextOutcome {
        let text = text.trim();
        let mut pending = self.pending.lock();

        let session = match pending.get_mut(&user) {
            None => return TextOutcome::NotConsumed,
            Some(PendingInput::SearchQuery) => {
                pending.remove(&user);
                return TextOutcome::SearchQuery(text.to_owned());
            }
            Some(PendingInput::Rating(session)) => session,
        };

        match session.step {
            Step::EnterName => {
                if !is_valid_name(text) {
                    return TextOutcome::InvalidName;
                }
                session.subject_name = text.split_whitespace().collect::<Vec<_>>().join(" ");
                session.step = Step::ChooseScore;
                TextOutcome::NameAccepted
            }
            Step::EnterReview => {
                let len = text.chars().count();
                if len < MIN_REVIEW_CHARS {
                    return TextOutcome::TooShort;
                }
                if len > MAX_REVIEW_CHARS {
                    return TextOutcome::TooLong;
                }
                session.text = text.to_owned();
                session.step = Step::Confirm;
                TextOutcome::ReadyToConfirm(session.clone())
            }
            Step::ChooseType | Step::ChooseScore | Step::Confirm => TextOutcome::AwaitingButton,
        }
    }

    /// Ends a confirmed session and hands it over for storage. Only the
    /// first call for a given session gets it.
    pub fn submit(&self, user: UserId) -> Option<RatingSession> {
        let mut pending = self.pending.lock();
        match pending.get(&user) {
            Some(PendingInput::Rating(session)) if session.step == Step::Confirm => {}
            _ => return None,
        }
        match pending.remove(&user) {
            Some(PendingInput::Rating(session)) => Some(session),
            _ => None,
        }
    }

    /// Drops whatever is pending. Returns whether a review was in progress.
    pub fn cancel(&self, user: UserId) -> bool {
        matches!(self.pending.lock().remove(&user), Some(PendingInput::Rating(_)))
    }

    fn advance(&self, user: UserId, expected: Step, f: impl FnOnce(&mut RatingSession)) -> bool {
        match self.pending.lock().get_mut(&user) {
            Some(PendingInput::Rating(session)) if session.step == expected => {
                f(session);
                true
            }
            _ => false,
        }
    }
}

pub fn is_valid_name(text: &str) -> bool {
    NAME_RE.is_match(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ChatId;

    const ADA: UserId = UserId(1);

    #[test]
    fn names_need_two_words_of_letters() {
        assert!(is_valid_name("Jane Doe"));
        assert!(is_valid_name("  Łukasz   Żółć "));
        assert!(!is_valid_name("Jane"));
        assert!(!is_valid_name("Jane Mary Doe"));
        assert!(!is_valid_name("Jane D0e"));
        assert!(!is_valid_name("Jane-Doe Smith"));
    }

    #[test]
    fn full_flow_reaches_confirm_and_submits_once() {
        let sessions = SessionManager::new();
        sessions.begin(ADA);
        assert_eq!(sessions.step(ADA), Some(Step::ChooseType));

        assert!(sessions.choose_type(ADA, false));
        assert_eq!(sessions.take_text(ADA, "Jane   Doe"), TextOutcome::NameAccepted);
        assert!(sessions.choose_score(ADA, 4));

        let TextOutcome::ReadyToConfirm(preview) =
            sessions.take_text(ADA, "this professor was excellent and clear")
        else {
            panic!("expected confirm step");
        };
        assert_eq!(preview.subject_name, "Jane Doe");

        let done = sessions.submit(ADA).unwrap();
        assert_eq!((done.score, done.anonymous), (4, false));
        assert_eq!(sessions.step(ADA), None);
        assert!(sessions.submit(ADA).is_none());
    }

    #[test]
    fn bad_input_reprompts_without_advancing() {
        let sessions = SessionManager::new();
        sessions.begin(ADA);
        sessions.choose_type(ADA, true);

        assert_eq!(sessions.take_text(ADA, "jane"), TextOutcome::InvalidName);
        assert_eq!(sessions.step(ADA), Some(Step::EnterName));

        sessions.take_text(ADA, "Jane Doe");
        sessions.choose_score(ADA, 2);
        assert_eq!(sessions.take_text(ADA, "too short"), TextOutcome::TooShort);
        assert_eq!(sessions.take_text(ADA, &"x".repeat(1001)), TextOutcome::TooLong);
        assert_eq!(sessions.step(ADA), Some(Step::EnterReview));

        // bounds are inclusive and counted in characters
        assert!(matches!(
            sessions.take_text(ADA, &"ż".repeat(1000)),
            TextOutcome::ReadyToConfirm(_)
        ));
    }

    #[test]
    fn out_of_order_buttons_are_ignored() {
        let sessions = SessionManager::new();
        assert!(!sessions.choose_type(ADA, false));

        sessions.begin(ADA);
        assert!(!sessions.choose_score(ADA, 3));
        assert!(sessions.submit(ADA).is_none());
        assert_eq!(sessions.take_text(ADA, "Jane Doe"), TextOutcome::AwaitingButton);
        assert_eq!(sessions.step(ADA), Some(Step::ChooseType));
    }

    #[test]
    fn cancel_from_every_step_removes_the_session() {
        let drive: [fn(&SessionManager); 5] = [
            |_| {},
            |s| {
                s.choose_type(ADA, false);
            },
            |s| {
                s.choose_type(ADA, false);
                s.take_text(ADA, "Jane Doe");
            },
            |s| {
                s.choose_type(ADA, false);
                s.take_text(ADA, "Jane Doe");
                s.choose_score(ADA, 5);
            },
            |s| {
                s.choose_type(ADA, false);
                s.take_text(ADA, "Jane Doe");
                s.choose_score(ADA, 5);
                s.take_text(ADA, "a perfectly fine review");
            },
        ];

        for to_step in drive {
            let sessions = SessionManager::new();
            sessions.begin(ADA);
            to_step(&sessions);
            assert!(sessions.cancel(ADA));
            assert_eq!(sessions.step(ADA), None);
            assert!(sessions.submit(ADA).is_none());
        }
    }

    #[test]
    fn search_prompt_consumes_one_message() {
        let sessions = SessionManager::new();
        assert_eq!(sessions.take_text(ADA, "smith"), TextOutcome::NotConsumed);

        sessions.await_search(ADA);
        assert!(sessions.is_awaiting_search(ADA));
        assert_eq!(sessions.step(ADA), None);
        assert_eq!(
            sessions.take_text(ADA, " smith "),
            TextOutcome::SearchQuery("smith".to_owned())
        );
        assert_eq!(sessions.take_text(ADA, "smith"), TextOutcome::NotConsumed);
    }

    #[test]
    fn prompts_hand_back_what_they_replace() {
        let sessions = SessionManager::new();
        let first = MessageRef { chat: ChatId(1), id: 10 };
        let second = MessageRef { chat: ChatId(1), id: 11 };

        assert_eq!(sessions.set_prompt(ADA, first), None, "no session yet");
        assert_eq!(sessions.begin(ADA), None);
        assert_eq!(sessions.set_prompt(ADA, first), None);
        assert_eq!(sessions.set_prompt(ADA, second), Some(first));
        assert_eq!(sessions.begin(ADA), Some(second));
    }

    #[test]
    fn begin_replaces_search_prompt() {
        let sessions = SessionManager::new();
        sessions.await_search(ADA);
        sessions.begin(ADA);
        assert!(!sessions.is_awaiting_search(ADA));
        assert_eq!(sessions.step(ADA), Some(Step::ChooseType));
    }
}
