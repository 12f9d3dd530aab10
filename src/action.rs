//! Button payloads.
//!
//! Every inline button carries one of these, encoded as a short
//! `_`-separated token. Decoding happens once, where the press comes in;
//! everything downstream matches on [`Action`].

use std::fmt;

use crate::gateway::UserId;
use crate::rating::ReviewId;

/// Upper bound on an encoded token; the transport rejects longer payloads.
pub const MAX_TOKEN_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WelcomeChoice {
    Student,
    Guest,
    Ads,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Welcome { user: UserId, choice: WelcomeChoice },
    QuizAnswer { user: UserId, question: usize, choice: usize },
    RateCancel,
    RateType { anonymous: bool },
    RateScore(u8),
    RateSubmit,
    Admin { decision: Decision, review: ReviewId },
    RatingsPage { page: usize, query: String },
    RatingsSearch,
    Unrecognized,
}

impl Action {
    /// Decodes a button press. The free-form `data` field wins over the
    /// short tag when both are present.
    pub fn parse(data: Option<&str>, short_tag: Option<&str>) -> Action {
        let token = match (data, short_tag) {
            (Some(data), _) if !data.is_empty() => data,
            (_, Some(tag)) if !tag.is_empty() => tag,
            _ => return Action::Unrecognized,
        };
        Self::decode(token).unwrap_or(Action::Unrecognized)
    }

    fn decode(token: &str) -> Option<Action> {
        use Action::*;

        if let Some(query) = token.strip_prefix("ratings_page_") {
            let (page, query) = query.split_once('_').unwrap_or((query, ""));
            return Some(RatingsPage {
                page: page.parse().ok()?,
                query: query.to_owned(),
            });
        }

        let parts: Vec<&str> = token.split('_').collect();
        let action = match parts.as_slice() {
            ["welcome", choice, user] => Welcome {
                user: UserId(user.parse().ok()?),
                choice: match *choice {
                    "student" => WelcomeChoice::Student,
                    "guest" => WelcomeChoice::Guest,
                    "ads" => WelcomeChoice::Ads,
                    _ => return None,
                },
            },
            ["quiz", user, question, choice] => QuizAnswer {
                user: UserId(user.parse().ok()?),
                question: question.parse().ok()?,
                choice: choice.parse().ok()?,
            },
            ["rate", "cancel"] => RateCancel,
            ["rate", "public"] => RateType { anonymous: false },
            ["rate", "anonymous"] => RateType { anonymous: true },
            ["rate", "submit"] => RateSubmit,
            ["rate", "score", n] => {
                let n: u8 = n.parse().ok()?;
                if !(1..=5).contains(&n) {
                    return None;
                }
                RateScore(n)
            }
            ["rate", kind, id] => Admin {
                decision: match *kind {
                    "approve" => Decision::Approve,
                    "reject" => Decision::Reject,
                    "block" => Decision::Block,
                    _ => return None,
                },
                review: id.parse().ok()?,
            },
            ["ratings", "search"] => RatingsSearch,
            _ => return None,
        };
        Some(action)
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Action::*;
        match self {
            Welcome { user, choice } => {
                let choice = match choice {
                    WelcomeChoice::Student => "student",
                    WelcomeChoice::Guest => "guest",
                    WelcomeChoice::Ads => "ads",
                };
                write!(f, "welcome_{choice}_{user}")
            }
            QuizAnswer { user, question, choice } => write!(f, "quiz_{user}_{question}_{choice}"),
            RateCancel => f.write_str("rate_cancel"),
            RateType { anonymous: false } => f.write_str("rate_public"),
            RateType { anonymous: true } => f.write_str("rate_anonymous"),
            RateScore(n) => write!(f, "rate_score_{n}"),
            RateSubmit => f.write_str("rate_submit"),
            Admin { decision, review } => {
                let kind = match decision {
                    Decision::Approve => "approve",
                    Decision::Reject => "reject",
                    Decision::Block => "block",
                };
                write!(f, "rate_{kind}_{review}")
            }
            RatingsPage { page, query } => {
                let head = format!("ratings_page_{page}_");
                let mut end = query.len().min(MAX_TOKEN_LEN.saturating_sub(head.len()));
                while !query.is_char_boundary(end) {
                    end -= 1;
                }
                write!(f, "{head}{}", &query[..end])
            }
            RatingsSearch => f.write_str("ratings_search"),
            Unrecognized => f.write_str("noop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(token: &str) -> Action {
        Action::parse(Some(token), None)
    }

    #[test]
    fn admin_tokens_carry_kind_and_id() {
        assert_eq!(
            parse("rate_approve_12"),
            Action::Admin { decision: Decision::Approve, review: 12 }
        );
        assert_eq!(
            parse("rate_block_3"),
            Action::Admin { decision: Decision::Block, review: 3 }
        );
        assert_eq!(parse("rate_approve_x"), Action::Unrecognized);
        assert_eq!(parse("rate_frobnicate_1"), Action::Unrecognized);
    }

    #[test]
    fn data_field_wins_over_short_tag() {
        let action = Action::parse(Some("rate_reject_9"), Some("rate_cancel"));
        assert_eq!(action, Action::Admin { decision: Decision::Reject, review: 9 });

        assert_eq!(Action::parse(Some(""), Some("rate_cancel")), Action::RateCancel);
        assert_eq!(Action::parse(None, Some("rate_submit")), Action::RateSubmit);
        assert_eq!(Action::parse(None, None), Action::Unrecognized);
    }

    #[test]
    fn scores_outside_range_are_rejected() {
        assert_eq!(parse("rate_score_5"), Action::RateScore(5));
        assert_eq!(parse("rate_score_0"), Action::Unrecognized);
        assert_eq!(parse("rate_score_6"), Action::Unrecognized);
    }

    #[test]
    fn ratings_page_keeps_query_with_underscores() {
        assert_eq!(
            parse("ratings_page_2_van_der"),
            Action::RatingsPage { page: 2, query: "van_der".to_owned() }
        );
        assert_eq!(
            parse("ratings_page_0_"),
            Action::RatingsPage { page: 0, query: String::new() }
        );
    }

    #[test]
    fn encoded_tokens_decode_to_themselves() {
        let actions = [
            Action::Welcome { user: UserId(77), choice: WelcomeChoice::Guest },
            Action::QuizAnswer { user: UserId(77), question: 2, choice: 0 },
            Action::RateType { anonymous: true },
            Action::Admin { decision: Decision::Reject, review: 40 },
            Action::RatingsPage { page: 1, query: "smith".to_owned() },
        ];
        for action in actions {
            assert_eq!(parse(&action.encode()), action);
        }
    }

    #[test]
    fn long_queries_are_cut_to_fit() {
        let query = "ż".repeat(60);
        let token = Action::RatingsPage { page: 3, query }.encode();
        assert!(token.len() <= MAX_TOKEN_LEN);
        assert!(matches!(parse(&token), Action::RatingsPage { page: 3, .. }));
    }
}
