use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),
    #[error("failed to download image: {0}")]
    Transport(String),
    #[error("image download returned HTTP {0}")]
    Status(u16),
    #[error("image exceeds the {limit} byte download limit")]
    TooLarge { limit: u64 },
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("text recognition service unreachable: {0}")]
    Transport(String),
    #[error("text recognition service error: {0}")]
    Service(String),
    #[error("failed to decode text recognition response: {0}")]
    Decode(String),
    #[error("no text found in the image")]
    NoText,
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("invalid {role} language '{tag}': {reason}")]
    InvalidLanguage {
        role: &'static str,
        tag: String,
        reason: String,
    },
    #[error("translation service unreachable: {0}")]
    Transport(String),
    #[error("translation service error: {0}")]
    Service(String),
    #[error("translation returned {actual} results for {expected} inputs")]
    LengthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode image: {0}")]
    Encoding(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
    #[error(transparent)]
    Translation(#[from] TranslationError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error("deadline exceeded while processing the request")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Fetch,
    Recognition,
    InvalidLanguage,
    Translation,
    UnsupportedFormat,
    Decode,
    Encoding,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Fetch => "fetch_error",
            ErrorKind::Recognition => "recognition_error",
            ErrorKind::InvalidLanguage => "invalid_language_error",
            ErrorKind::Translation => "translation_error",
            ErrorKind::UnsupportedFormat => "unsupported_format_error",
            ErrorKind::Decode => "decode_error",
            ErrorKind::Encoding => "encoding_error",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::Fetch(_) => ErrorKind::Fetch,
            PipelineError::Recognition(_) => ErrorKind::Recognition,
            PipelineError::Translation(TranslationError::InvalidLanguage { .. }) => {
                ErrorKind::InvalidLanguage
            }
            PipelineError::Translation(_) => ErrorKind::Translation,
            PipelineError::Compose(ComposeError::UnsupportedFormat(_)) => {
                ErrorKind::UnsupportedFormat
            }
            PipelineError::Compose(ComposeError::Decode(_)) => ErrorKind::Decode,
            PipelineError::Compose(ComposeError::Encoding(_)) => ErrorKind::Encoding,
            PipelineError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }
}
