use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::error::CoachError;
use super::prompt::build_prompt;
use crate::models::Trade;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const QUOTA_HINT: &str = "(Please check your Google AI Studio quota)";

/// Text-generation backend used by the coach.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Sends one prompt and returns the first generated text.
    async fn generate(&self, prompt: &str) -> Result<String, CoachError>;
}

/// Asks the generator for three coaching insights on the most recent trades.
/// One request, no retry.
pub async fn request_insights(
    generator: &dyn InsightGenerator,
    trades: &[Trade],
) -> Result<String, CoachError> {
    let prompt = build_prompt(trades);
    log::info!(
        "Requesting coaching insights from {} for {} trades",
        generator.name(),
        trades.len().min(super::prompt::RECENT_TRADE_WINDOW)
    );
    generator.generate(&prompt).await.inspect_err(|e| {
        log::error!("AI coach request failed: {}", e);
    })
}

/// Gemini `generateContent` client, authenticated by a query-string key.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// The `generateContent` call; the key travels form-encoded in the query.
    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        self.http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&GenerateRequest::single(prompt))
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl GenerateRequest {
    fn single(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }
}

/// Maps the endpoint's status and body to the generated text or a typed error.
fn parse_generate_response(status: StatusCode, body: &str) -> Result<String, CoachError> {
    let parsed: Option<GenerateResponse> = serde_json::from_str(body).ok();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let message = parsed
            .and_then(|r| r.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| "Rate limit exceeded.".to_string());
        return Err(CoachError::RateLimited(format!("{} {}", message, QUOTA_HINT)));
    }

    let response = parsed.ok_or_else(|| {
        CoachError::ParseError(format!("Unexpected response ({}): {}", status, body))
    })?;

    if let Some(error) = response.error {
        return Err(CoachError::ApiError(
            error.message.unwrap_or_else(|| status.to_string()),
        ));
    }

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|text| !text.is_empty())
        .ok_or(CoachError::EmptyResponse)
}

#[async_trait]
impl InsightGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, CoachError> {
        if self.api_key.trim().is_empty() {
            return Err(CoachError::MissingApiKey);
        }

        let response = self.request(prompt).send().await?;

        let status = response.status();
        let body = response.text().await?;
        parse_generate_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_request_serialization() {
        let value = serde_json::to_value(GenerateRequest::single("hello")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "contents": [{ "parts": [{ "text": "hello" }] }] })
        );
    }

    #[test]
    fn test_request_carries_model_and_encoded_key() {
        let client = GeminiClient::new("AIza-test").with_base_url("http://localhost:8080/");
        let request = client.request("hi").build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent?key=AIza-test"
        );

        let client = GeminiClient::new("a&b=c");
        let request = client.request("hi").build().unwrap();
        assert_eq!(request.url().query(), Some("key=a%26b%3Dc"));
    }

    #[test]
    fn test_first_candidate_text_is_returned_verbatim() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"* Cut size after two losses"}]}},{"content":{"parts":[{"text":"other"}]}}]}"#;
        let text = parse_generate_response(StatusCode::OK, body).unwrap();
        assert_eq!(text, "* Cut size after two losses");
    }

    #[test]
    fn test_rate_limit_is_distinguished() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#;
        let err = parse_generate_response(StatusCode::TOO_MANY_REQUESTS, body).unwrap_err();
        assert!(err.is_rate_limited());
        assert!(err.to_string().starts_with("Resource has been exhausted"));
        assert!(err.to_string().contains("quota"));

        let err = parse_generate_response(StatusCode::TOO_MANY_REQUESTS, "busy").unwrap_err();
        assert!(err.to_string().starts_with("Rate limit exceeded."));
    }

    #[test]
    fn test_error_body_and_empty_candidates() {
        let body = r#"{"error":{"code":400,"message":"API key not valid"}}"#;
        let err = parse_generate_response(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(err, CoachError::ApiError(ref m) if m == "API key not valid"));

        let err = parse_generate_response(StatusCode::OK, r#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, CoachError::EmptyResponse));
        assert_eq!(err.to_string(), "No insights generated.");

        let err = parse_generate_response(StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert!(matches!(err, CoachError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let client = GeminiClient::new("  ");
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, CoachError::MissingApiKey));
    }

    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InsightGenerator for RecordingGenerator {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, prompt: &str) -> Result<String, CoachError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("- Journal every trade".to_string())
        }
    }

    #[tokio::test]
    async fn test_request_insights_sends_one_prompt() {
        let generator = RecordingGenerator {
            prompts: Mutex::new(Vec::new()),
        };
        let trades: Vec<Trade> = vec![serde_json::from_value(serde_json::json!({
            "id": "1", "pair": "BTC/USD", "result": "Win", "pnl": 5
        }))
        .unwrap()];

        let text = request_insights(&generator, &trades).await.unwrap();

        assert_eq!(text, "- Journal every trade");
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Pair: BTC/USD"));
    }
}
