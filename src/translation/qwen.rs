use std::env;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{language_display_name, TranslationError, TranslationRequest, Translator};

/// Environment variable holding the DashScope API key.
pub const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

pub const DEFAULT_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";

pub const DEFAULT_MODEL: &str = "qwen-turbo";

/// Key fragments that mark a copied sample config rather than a real key.
const PLACEHOLDER_KEY_MARKERS: [&str; 3] = ["demo", "placeholder", "YOUR_"];

#[derive(Debug, Serialize)]
struct QwenMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct QwenInput {
    messages: Vec<QwenMessage>,
}

#[derive(Debug, Serialize)]
struct QwenParameters {
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct QwenRequest {
    model: String,
    input: QwenInput,
    parameters: QwenParameters,
}

#[derive(Debug, Deserialize)]
struct QwenResponse {
    output: Option<QwenOutput>,
}

#[derive(Debug, Deserialize)]
struct QwenOutput {
    text: Option<String>,
}

/// Context-aware translation through the DashScope text-generation API.
pub struct QwenTranslator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl QwenTranslator {
    pub fn new(api_key: Option<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Read the key from [`API_KEY_ENV`]; a missing key surfaces per segment
    /// as [`TranslationError::NoApiKey`].
    pub fn from_env() -> Self {
        Self::new(env::var(API_KEY_ENV).ok())
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn validated_key(&self) -> Result<&str, TranslationError> {
        let key = self.api_key.as_deref().ok_or(TranslationError::NoApiKey)?;
        if PLACEHOLDER_KEY_MARKERS
            .iter()
            .any(|marker| key.contains(marker))
        {
            return Err(TranslationError::InvalidApiKey);
        }
        Ok(key)
    }
}

pub(crate) fn build_prompt(request: &TranslationRequest) -> String {
    let from = language_display_name(&request.source_language);
    let to = language_display_name(&request.target_language);

    let mut prompt = format!("Please translate the following {from} text to {to}. ");
    if !request.context.is_empty() {
        prompt.push_str(&format!(
            "Context for better understanding: {}. ",
            request.context
        ));
    }
    prompt.push_str(
        "Ensure the translation is natural, accurate, and maintains the original meaning and tone. ",
    );
    prompt.push_str(&format!("Text to translate: {}", request.text));
    prompt
}

#[async_trait]
impl Translator for QwenTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        if request.text.trim().is_empty() {
            return Err(TranslationError::EmptyText);
        }
        let api_key = self.validated_key()?;

        let body = QwenRequest {
            model: self.model.clone(),
            input: QwenInput {
                messages: vec![QwenMessage {
                    role: "user",
                    content: build_prompt(request),
                }],
            },
            parameters: QwenParameters {
                temperature: 0.3,
                max_tokens: 500,
                top_p: 0.8,
            },
        };

        debug!(
            "Sending translation request ({} -> {}) to {}",
            request.source_language, request.target_language, self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| TranslationError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Api {
                status: status.as_u16(),
            });
        }

        let parsed: QwenResponse = response
            .json()
            .await
            .map_err(|_| TranslationError::InvalidResponse)?;

        parsed
            .output
            .and_then(|output| output.text)
            .map(|text| text.trim().to_string())
            .ok_or(TranslationError::InvalidResponse)
    }
}
