pub mod extract;
pub mod matcher;
pub mod models;
pub mod prompt;
pub mod providers;

pub use extract::MAX_MATCHES;
pub use matcher::{CampaignMatch, CampaignSummary, MatchEngine, MatchInput};
pub use providers::openai::OpenAiProvider;
