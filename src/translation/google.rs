use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{TranslateFuture, TranslationEngine};
use crate::error::TranslationError;
use crate::languages::LanguageTag;

pub(crate) const DEFAULT_ENDPOINT: &str =
    "https://translation.googleapis.com/language/translate/v2";

/// Most `q` entries the v2 endpoint accepts in one request.
pub const MAX_SEGMENTS: usize = 128;

/// Google Cloud Translation (v2) over REST.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: reqwest::Client,
    key: String,
    endpoint: String,
}

impl GoogleTranslate {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            key: key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        if !endpoint.trim().is_empty() {
            self.endpoint = endpoint;
        }
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[derive(Debug, Serialize)]
struct TranslateBody<'a> {
    q: &'a [String],
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    format: &'static str,
}

impl TranslationEngine for GoogleTranslate {
    fn translate<'a>(
        &'a self,
        texts: &'a [String],
        target: &'a LanguageTag,
        source: Option<&'a LanguageTag>,
    ) -> TranslateFuture<'a> {
        Box::pin(async move {
            if texts.len() > MAX_SEGMENTS {
                warn!(
                    segments = texts.len(),
                    limit = MAX_SEGMENTS,
                    "translation batch exceeds the per-request segment limit"
                );
                return Err(TranslationError::Service(format!(
                    "batch of {} segments exceeds the limit of {} per request",
                    texts.len(),
                    MAX_SEGMENTS
                )));
            }
            debug!(segments = texts.len(), target = %target, "sending translation batch");
            let body = TranslateBody {
                q: texts,
                target: target.as_str(),
                source: source.map(LanguageTag::as_str),
                format: "text",
            };
            let response = self
                .client
                .post(&self.endpoint)
                .header("x-goog-api-key", self.key.as_str())
                .json(&body)
                .send()
                .await
                .map_err(|err| TranslationError::Transport(err.to_string()))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|err| TranslationError::Transport(err.to_string()))?;
            if !status.is_success() {
                return Err(TranslationError::Service(format!(
                    "HTTP {}: {}",
                    status,
                    extract_translate_error(&text).unwrap_or(text)
                )));
            }
            parse_translate_response(&text)
        })
    }
}

fn parse_translate_response(text: &str) -> Result<Vec<String>, TranslationError> {
    let payload: TranslateResponse = serde_json::from_str(text)
        .map_err(|err| TranslationError::Service(format!("malformed response: {}", err)))?;
    Ok(payload
        .data
        .translations
        .into_iter()
        .map(|item| item.translated_text)
        .collect())
}

fn extract_translate_error(text: &str) -> Option<String> {
    let payload: ErrorEnvelope = serde_json::from_str(text).ok()?;
    let message = payload.error.message.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<TranslationItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationItem {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}
