use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

pub const IMAGE_DESCRIPTION_PROMPT: &str =
    "Describe and summarize this image in educational context.";
pub const SUMMARY_PROMPT_PREFIX: &str = "Summarize this content for students and provide examples:";

/// Inline binary payload sent alongside a prompt. `data` is already base64-encoded.
#[derive(Debug, Clone)]
pub struct FileAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: String,
}

impl FileAttachment {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestPart {
    Text(String),
    InlineData(FileAttachment),
}

/// A single-turn `generateContent` call.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub parts: Vec<RequestPart>,
    pub thinking_budget: Option<u32>,
}

impl LlmRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![RequestPart::Text(prompt.into())],
            thinking_budget: None,
        }
    }

    pub fn with_attachment(mut self, attachment: FileAttachment) -> Self {
        self.parts.push(RequestPart::InlineData(attachment));
        self
    }

    /// Ask the model to skip extended reasoning so replies come back faster.
    pub fn without_thinking(mut self) -> Self {
        self.thinking_budget = Some(0);
        self
    }

    fn to_payload(&self) -> Value {
        let parts: Vec<Value> = self
            .parts
            .iter()
            .map(|part| match part {
                RequestPart::Text(text) => json!({ "text": text }),
                RequestPart::InlineData(attachment) => json!({
                    "inlineData": {
                        "mimeType": attachment.content_type,
                        "data": attachment.data,
                    }
                }),
            })
            .collect();

        let mut payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
        });

        if let Some(budget) = self.thinking_budget {
            payload["generationConfig"] = json!({
                "thinkingConfig": { "thinkingBudget": budget }
            });
        }

        payload
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub response_tokens: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub token_usage: TokenUsage,
    pub model: String,
}

/// Thin client over the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

#[derive(Clone)]
struct LlmConfig {
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl LlmClient {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            config: LlmConfig {
                api_key,
                model: model.into(),
                api_base: api_base.into(),
            },
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Plain chat completion with reasoning disabled.
    pub async fn complete_text(&self, message: &str) -> Result<String> {
        self.reply_text(LlmRequest::text(message).without_thinking())
            .await
    }

    /// Student-oriented summary of extracted document text.
    pub async fn summarize(&self, content: &str) -> Result<String> {
        self.reply_text(
            LlmRequest::text(format!("{SUMMARY_PROMPT_PREFIX}\n{content}")).without_thinking(),
        )
        .await
    }

    pub async fn describe_image(&self, image: FileAttachment) -> Result<String> {
        debug!(file = %image.filename, mime_type = %image.content_type, "describing image");
        self.reply_text(LlmRequest::text(IMAGE_DESCRIPTION_PROMPT).with_attachment(image))
            .await
    }

    async fn reply_text(&self, request: LlmRequest) -> Result<String> {
        let response = self.execute(request).await?;
        debug!(
            model = %response.model,
            prompt_tokens = response.token_usage.prompt_tokens,
            response_tokens = response.token_usage.response_tokens,
            total_tokens = response.token_usage.total_tokens,
            "gemini call completed"
        );
        Ok(response.text)
    }

    pub async fn execute(&self, request: LlmRequest) -> Result<LlmResponse> {
        let Some(api_key) = self.config.api_key.as_ref() else {
            bail!("GOOGLE_GEMINI_API_KEY is not configured but required for Gemini requests");
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request.to_payload())
            .send()
            .await
            .context("failed to reach Gemini")?;

        let status = response.status();
        let response_text = response.text().await.context("failed to read response body")?;
        let body: Value = serde_json::from_str(&response_text).with_context(|| {
            format!(
                "failed to parse Gemini response as JSON. Response body: {}",
                preview(&response_text)
            )
        })?;
        if !status.is_success() {
            bail!("gemini call failed with status {}: {}", status, body);
        }

        let (text, token_usage) = extract_text_and_usage(&body)
            .ok_or_else(|| anyhow!("unexpected Gemini response payload: {}", body))?;

        Ok(LlmResponse {
            text,
            token_usage,
            model: self.config.model.clone(),
        })
    }
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(500) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Concatenate the non-thought text parts of the first candidate.
fn extract_text_and_usage(value: &Value) -> Option<(String, TokenUsage)> {
    let payload = serde_json::from_value::<GenerateContentPayload>(value.clone()).ok()?;
    let candidate = payload.candidates.into_iter().next()?;

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let token_usage = payload
        .usage_metadata
        .map(|usage| TokenUsage {
            prompt_tokens: usage.prompt_token_count.unwrap_or_default(),
            response_tokens: usage.candidates_token_count.unwrap_or_default(),
            total_tokens: usage.total_token_count.unwrap_or_default(),
        })
        .unwrap_or_default();

    Some((text, token_usage))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentPayload {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<usize>,
    #[serde(default)]
    candidates_token_count: Option<usize>,
    #[serde(default)]
    total_token_count: Option<usize>,
}
