//! Timeline and conversation rules: the seed profile catalog, the scripted
//! conversation stepper, the like counter and the matches cache policy.

pub mod cache;
pub mod catalog;
pub mod likes;
pub mod stepper;

pub use cache::MatchesCache;
pub use catalog::{Line, SeedProfile, Stage};
pub use likes::LikeCounter;
pub use stepper::Stepper;
