use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;

use super::{TextAnnotation, VisionClient, VisionFuture};
use crate::error::RecognitionError;

pub(crate) const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Google Cloud Vision `DOCUMENT_TEXT_DETECTION` over REST.
///
/// Holds a pooled `reqwest::Client`; clones share the pool and the handle is
/// safe to use from concurrent requests.
#[derive(Debug, Clone)]
pub struct GoogleVision {
    client: reqwest::Client,
    key: String,
    endpoint: String,
}

impl GoogleVision {
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

impl VisionClient for GoogleVision {
    fn detect<'a>(&'a self, image_bytes: &'a [u8]) -> VisionFuture<'a> {
        Box::pin(async move {
            let body = json!({
                "requests": [
                    {
                        "image": { "content": BASE64.encode(image_bytes) },
                        "features": [ { "type": "DOCUMENT_TEXT_DETECTION" } ]
                    }
                ]
            });
            let response = self
                .client
                .post(&self.endpoint)
                .header("x-goog-api-key", self.key.as_str())
                .json(&body)
                .send()
                .await
                .map_err(|err| RecognitionError::Transport(err.to_string()))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|err| RecognitionError::Transport(err.to_string()))?;
            if !status.is_success() {
                return Err(RecognitionError::Service(format!(
                    "HTTP {}: {}",
                    status,
                    extract_vision_error(&text).unwrap_or(text)
                )));
            }
            parse_annotate_response(&text)
        })
    }
}

fn parse_annotate_response(text: &str) -> Result<Option<TextAnnotation>, RecognitionError> {
    let payload: AnnotateResponse =
        serde_json::from_str(text).map_err(|err| RecognitionError::Decode(err.to_string()))?;
    let Some(first) = payload.responses.into_iter().next() else {
        return Err(RecognitionError::Decode(
            "response contained no annotation results".to_string(),
        ));
    };
    if let Some(error) = first.error {
        return Err(RecognitionError::Service(error.describe()));
    }
    Ok(first.full_text_annotation)
}

fn extract_vision_error(text: &str) -> Option<String> {
    let payload: ErrorEnvelope = serde_json::from_str(text).ok()?;
    Some(payload.error.describe())
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    full_text_annotation: Option<TextAnnotation>,
    #[serde(default)]
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiStatus,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl ApiStatus {
    fn describe(&self) -> String {
        if self.message.trim().is_empty() {
            format!("code {}", self.code)
        } else {
            format!("{} (code {})", self.message, self.code)
        }
    }
}
