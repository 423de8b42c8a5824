//! Text-completion collaborator.
//!
//! The conversation handler only needs two things from a language model:
//! complete a list of chat messages, and say whether a piece of text should
//! be refused. [`OpenRouterClient`] does both against an OpenAI-compatible
//! `chat/completions` endpoint.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use coursewise_shared::{AppConfig, ChatMessage, CoursewiseError, Result, resolve_api_key};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const MODERATION_PROMPT: &str = "You are a content moderation classifier for a course \
recommendation assistant. Decide whether the text you are given contains hate, harassment, \
violence, self-harm, sexual content, or instructions for illegal activity. \
Answer with a single character: Y if the text should be refused, N otherwise.";

/// Outcome of a moderation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationVerdict {
    Allowed,
    Flagged,
}

impl ModerationVerdict {
    pub fn is_flagged(self) -> bool {
        self == Self::Flagged
    }
}

/// A language model the conversation handler can talk to.
pub trait CompletionClient: Send + Sync {
    /// Complete `messages`, returning the assistant's text.
    fn complete(&self, messages: &[ChatMessage]) -> impl Future<Output = Result<String>> + Send;

    /// Classify `text` for refusal.
    fn moderate(&self, text: &str) -> impl Future<Output = Result<ModerationVerdict>> + Send;
}

// ---------------------------------------------------------------------------
// OpenRouter
// ---------------------------------------------------------------------------

/// OpenAI-compatible chat completions client (OpenRouter by default).
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OpenRouterClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        temperature: f32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoursewiseError::Completion(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temperature,
        })
    }

    /// Build a client from the `[openrouter]` section; the key is read from
    /// the environment variable it names.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        Self::new(
            api_key,
            &config.openrouter.default_model,
            &config.openrouter.base_url,
            config.openrouter.temperature,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| CoursewiseError::config("OpenRouter API key contains invalid characters"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl CompletionClient for OpenRouterClient {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoursewiseError::Completion(format!("failed to call chat completions: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(CoursewiseError::Completion(format!(
                "OpenRouter returned {status}: {detail}"
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| CoursewiseError::parse(format!("failed to parse completion response: {e}")))?;

        let answer = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .unwrap_or_default();
        debug!(chars = answer.len(), "completion received");
        Ok(answer)
    }

    async fn moderate(&self, text: &str) -> Result<ModerationVerdict> {
        let messages = [ChatMessage::system(MODERATION_PROMPT), ChatMessage::user(text)];
        let answer = self.complete(&messages).await?;
        Ok(parse_verdict(&answer))
    }
}

/// `Y` (any case, leading whitespace ignored) flags; anything else allows.
fn parse_verdict(answer: &str) -> ModerationVerdict {
    match answer.trim_start().chars().next() {
        Some('Y' | 'y') => ModerationVerdict::Flagged,
        _ => ModerationVerdict::Allowed,
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
