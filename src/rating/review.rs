use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::gateway::UserId;
use crate::i18n::Lang;
use crate::store::JsonFile;

pub type ReviewId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// A submitted review. Only `status` ever changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub author_id: UserId,
    pub display_name: String,
    pub is_anonymous: bool,
    pub subject_name: String,
    pub score: u8,
    pub text: String,
    pub status: ReviewStatus,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    /// Language the author used, for decision notices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<Lang>,
}

/// What a submitter provides; the store fills in id, status and time.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub author_id: UserId,
    pub display_name: String,
    pub is_anonymous: bool,
    pub subject_name: String,
    pub score: u8,
    pub text: String,
    pub lang: Option<Lang>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RatingsDoc {
    #[serde(default)]
    reviews: Vec<Review>,
    #[serde(default)]
    blocked_users: Vec<UserId>,
    #[serde(default)]
    next_id: ReviewId,
}

pub struct ReviewStore {
    doc: RwLock<RatingsDoc>,
    file: JsonFile,
}

impl ReviewStore {
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let file = JsonFile::new(dir, "ratings");
        let mut doc: RatingsDoc = file.load();

        // ids are never handed out twice, even if the file was edited by hand
        let past_max = doc.reviews.iter().map(|r| r.id + 1).max().unwrap_or(1);
        doc.next_id = doc.next_id.max(past_max);

        Self {
            doc: RwLock::new(doc),
            file,
        }
    }

    /// Stores the review as pending under the next id and returns it.
    pub fn append(&self, new: NewReview) -> Review {
        let mut doc = self.doc.write();
        let review = Review {
            id: doc.next_id,
            author_id: new.author_id,
            display_name: new.display_name,
            is_anonymous: new.is_anonymous,
            subject_name: new.subject_name,
            score: new.score,
            text: new.text,
            status: ReviewStatus::Pending,
            created_at: now_seconds(),
            lang: new.lang,
        };
        doc.next_id += 1;
        doc.reviews.push(review.clone());
        self.file.save_or_log(&*doc);
        review
    }

    pub fn get(&self, id: ReviewId) -> Option<Review> {
        self.doc.read().reviews.iter().find(|r| r.id == id).cloned()
    }

    /// False if there is no such review.
    pub fn set_status(&self, id: ReviewId, status: ReviewStatus) -> bool {
        let mut doc = self.doc.write();
        let Some(review) = doc.reviews.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        review.status = status;
        self.file.save_or_log(&*doc);
        true
    }

    /// Approved reviews in submission order.
    pub fn approved(&self) -> Vec<Review> {
        self.doc
            .read()
            .reviews
            .iter()
            .filter(|r| r.status == ReviewStatus::Approved)
            .cloned()
            .collect()
    }

    /// Approved reviews whose subject contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<Review> {
        let query = query.trim().to_lowercase();
        self.doc
            .read()
            .reviews
            .iter()
            .filter(|r| r.status == ReviewStatus::Approved)
            .filter(|r| r.subject_name.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    pub fn is_blocked(&self, user: UserId) -> bool {
        self.doc.read().blocked_users.contains(&user)
    }

    /// Returns false if the user was already blocked.
    pub fn block(&self, user: UserId) -> bool {
        let mut doc = self.doc.write();
        if doc.blocked_users.contains(&user) {
            return false;
        }
        doc.blocked_users.push(user);
        self.file.save_or_log(&*doc);
        true
    }

    pub fn next_id(&self) -> ReviewId {
        self.doc.read().next_id
    }
}

/// Current time at the precision the document keeps.
fn now_seconds() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(0).unwrap_or(now)
}
