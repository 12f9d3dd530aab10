mod filter;
pub mod quiz;
mod ratelimit;
mod verification;
mod violations;

pub use filter::PhraseFilter;
pub use ratelimit::RateLimiter;
pub use verification::VerificationState;
pub use violations::ViolationTracker;
