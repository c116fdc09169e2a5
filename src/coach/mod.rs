pub mod client;
pub mod error;
pub mod prompt;

pub use client::{request_insights, GeminiClient, InsightGenerator};
pub use error::CoachError;
pub use prompt::build_prompt;
