mod google;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tracing::debug;

use crate::error::TranslationError;
use crate::languages::{LanguageTag, is_auto, parse_source_lang};

pub use google::GoogleTranslate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationBatchRequest {
    pub texts: Vec<String>,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationResult {
    pub original: String,
    pub translated: String,
    pub source_lang: String,
    pub target_lang: String,
}

pub type TranslateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<String>, TranslationError>> + Send + 'a>>;

/// Boundary to the external translation engine. Implementations must return
/// one string per input, in input order.
pub trait TranslationEngine: Send + Sync {
    fn translate<'a>(
        &'a self,
        texts: &'a [String],
        target: &'a LanguageTag,
        source: Option<&'a LanguageTag>,
    ) -> TranslateFuture<'a>;
}

/// Parses a language pair. `None` source means the engine detects it.
pub fn parse_language_pair(
    source_lang: &str,
    target_lang: &str,
) -> Result<(Option<LanguageTag>, LanguageTag), TranslationError> {
    let source = parse_source_lang(source_lang).map_err(|err| TranslationError::InvalidLanguage {
        role: "source",
        tag: source_lang.to_string(),
        reason: err.to_string(),
    })?;
    if !target_lang.trim().is_empty() && is_auto(target_lang) {
        return Err(TranslationError::InvalidLanguage {
            role: "target",
            tag: target_lang.to_string(),
            reason: "auto-detection applies to the source language only".to_string(),
        });
    }
    let target = LanguageTag::parse(target_lang).map_err(|err| TranslationError::InvalidLanguage {
        role: "target",
        tag: target_lang.to_string(),
        reason: err.to_string(),
    })?;
    Ok((source, target))
}

#[derive(Debug, Clone)]
pub struct Translator<E> {
    engine: E,
}

impl<E: TranslationEngine> Translator<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Translates the whole batch in one engine call. The result has the same
    /// length and order as `request.texts`; any failure fails the batch.
    pub async fn translate_batch(
        &self,
        request: &TranslationBatchRequest,
    ) -> Result<Vec<TranslationResult>, TranslationError> {
        let (source, target) = parse_language_pair(&request.source_lang, &request.target_lang)?;
        if request.texts.is_empty() {
            return Ok(Vec::new());
        }

        let translated = self
            .engine
            .translate(&request.texts, &target, source.as_ref())
            .await?;
        if translated.len() != request.texts.len() {
            return Err(TranslationError::LengthMismatch {
                expected: request.texts.len(),
                actual: translated.len(),
            });
        }
        debug!(count = translated.len(), target = %target, "translated batch");

        Ok(request
            .texts
            .iter()
            .zip(translated)
            .map(|(original, translated)| TranslationResult {
                original: original.clone(),
                translated,
                source_lang: request.source_lang.clone(),
                target_lang: request.target_lang.clone(),
            })
            .collect())
    }
}
