pub mod candidates;
pub mod matching;

pub use candidates::CandidateSelector;
pub use matching::MatchEngine;
