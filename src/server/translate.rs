use axum::http::StatusCode;
use tokio::time::Instant;
use tracing::warn;

use crate::error::{ErrorKind, PipelineError, RecognitionError};
use crate::fetch::ImageFetcher;
use crate::ocr::VisionClient;
use crate::translation::TranslationEngine;

use super::models::{ErrorResponse, TranslateRequest, TranslateResponse};
use super::state::ServerState;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: ErrorKind::Validation.as_str(),
            message: message.into(),
        }
    }

    pub(crate) fn body(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.message.clone(),
            kind: self.kind.to_string(),
        }
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        let kind = err.kind();
        let status = match (&err, kind) {
            (PipelineError::Recognition(RecognitionError::NoText), _) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            (_, ErrorKind::Validation | ErrorKind::InvalidLanguage) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::UnsupportedFormat) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            (_, ErrorKind::Decode) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, ErrorKind::Fetch | ErrorKind::Recognition | ErrorKind::Translation) => {
                StatusCode::BAD_GATEWAY
            }
            (_, ErrorKind::Encoding) => StatusCode::INTERNAL_SERVER_ERROR,
            (_, ErrorKind::DeadlineExceeded) => StatusCode::GATEWAY_TIMEOUT,
        };
        Self {
            status,
            kind: kind.as_str(),
            message: err.to_string(),
        }
    }
}

pub(crate) async fn translate_request<F, C, E>(
    state: &ServerState<F, C, E>,
    request: TranslateRequest,
) -> Result<TranslateResponse, ServerError>
where
    F: ImageFetcher,
    C: VisionClient,
    E: TranslationEngine,
{
    let pipeline = &state.pipeline;
    let outcome = match state.request_timeout {
        Some(timeout) => {
            pipeline
                .run_with_deadline(
                    &request.image_url,
                    &request.source_lang,
                    &request.target_lang,
                    Instant::now() + timeout,
                )
                .await
        }
        None => {
            pipeline
                .run(&request.image_url, &request.source_lang, &request.target_lang)
                .await
        }
    };
    match outcome {
        Ok(result) => Ok(TranslateResponse::from(&result)),
        Err(err) => {
            warn!(kind = err.kind().as_str(), "translate request failed: {}", err);
            Err(ServerError::from(err))
        }
    }
}
