use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoachError {
    #[error("No API key configured for the AI coach")]
    MissingApiKey,

    #[error("{0}")]
    RateLimited(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("AI coach error: {0}")]
    ApiError(String),

    #[error("Invalid API response: {0}")]
    ParseError(String),

    #[error("No insights generated.")]
    EmptyResponse,
}

impl CoachError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CoachError::RateLimited(_))
    }
}
