pub mod render;
mod review;
mod router;
mod session;

pub use review::{NewReview, Review, ReviewId, ReviewStatus, ReviewStore};
pub use router::ModerationRouter;
pub use session::{
    is_valid_name, PendingInput, RatingSession, SessionManager, Step, TextOutcome,
    MAX_REVIEW_CHARS, MIN_REVIEW_CHARS,
};
