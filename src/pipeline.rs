use reqwest::Url;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{ComposeError, PipelineError, RecognitionError, TranslationError};
use crate::fetch::ImageFetcher;
use crate::geom::Rect;
use crate::ocr::{RecognitionResult, RecognizedUnit, Recognizer, VisionClient};
use crate::render::{self, OverlaySpec, OverlayStyle};
use crate::translation::{
    TranslationBatchRequest, TranslationEngine, TranslationResult, Translator, parse_language_pair,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineItem {
    pub original_text: String,
    pub translated_text: String,
    pub confidence: f32,
    pub bounds: Rect,
}

/// Everything one request produced. Owns its data; nothing is shared with
/// other requests.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub original_full_text: String,
    pub translated_full_text: String,
    pub items: Vec<PipelineItem>,
    pub composed_image: Vec<u8>,
}

/// Fetch → recognise → translate → compose, strictly in that order.
///
/// Client handles are injected by the caller and may be shared by any number
/// of concurrent `run` calls.
#[derive(Debug, Clone)]
pub struct Pipeline<F, C, E> {
    fetcher: F,
    recognizer: Recognizer<C>,
    translator: Translator<E>,
    style: OverlayStyle,
    allow_empty: bool,
}

impl<F, C, E> Pipeline<F, C, E>
where
    F: ImageFetcher,
    C: VisionClient,
    E: TranslationEngine,
{
    pub fn new(fetcher: F, recognizer: Recognizer<C>, translator: Translator<E>) -> Self {
        Self {
            fetcher,
            recognizer,
            translator,
            style: OverlayStyle::default(),
            allow_empty: false,
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    /// When set, an image without text yields an empty result carrying the
    /// original bytes instead of a recognition error.
    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn recognizer(&self) -> &Recognizer<C> {
        &self.recognizer
    }

    pub fn translator(&self) -> &Translator<E> {
        &self.translator
    }

    pub async fn run(
        &self,
        image_url: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<PipelineResult, PipelineError> {
        let url = validate_image_url(image_url)?;
        parse_language_pair(source_lang, target_lang)?;
        info!(url = %url, source = source_lang, target = target_lang, "processing image");

        let image_bytes = self.fetcher.fetch(&url).await?;

        let recognition = match self.recognizer.extract_text(&image_bytes).await {
            Ok(recognition) => recognition,
            Err(RecognitionError::NoText) if self.allow_empty => {
                info!("no text detected; returning the original image");
                return Ok(PipelineResult {
                    original_full_text: String::new(),
                    translated_full_text: String::new(),
                    items: Vec::new(),
                    composed_image: image_bytes,
                });
            }
            Err(err) => {
                warn!("text recognition failed: {}", err);
                return Err(err.into());
            }
        };
        info!(units = recognition.units.len(), "text recognition completed");

        let request = TranslationBatchRequest {
            texts: build_translation_batch(&recognition),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        };
        let translations = self.translator.translate_batch(&request).await?;
        let Some((full_text, unit_translations)) = translations.split_first() else {
            return Err(TranslationError::LengthMismatch {
                expected: request.texts.len(),
                actual: 0,
            }
            .into());
        };
        info!(count = translations.len(), "translation completed");

        let overlays = zip_overlays(&recognition.units, unit_translations)?;
        let style = self.style.clone();
        let composed_image = tokio::task::spawn_blocking(move || {
            render::compose_overlay(&image_bytes, &overlays, &style)
        })
        .await
        .map_err(|err| ComposeError::Encoding(format!("compositor task failed: {}", err)))??;
        info!(bytes = composed_image.len(), "image composition completed");

        let items = recognition
            .units
            .iter()
            .zip(unit_translations)
            .map(|(unit, translation)| PipelineItem {
                original_text: unit.text.clone(),
                translated_text: translation.translated.clone(),
                confidence: unit.confidence,
                bounds: unit.bounds,
            })
            .collect();

        Ok(PipelineResult {
            original_full_text: recognition.full_text,
            translated_full_text: full_text.translated.clone(),
            items,
            composed_image,
        })
    }

    /// Runs the pipeline, dropping any in-flight external call once `deadline`
    /// passes.
    pub async fn run_with_deadline(
        &self,
        image_url: &str,
        source_lang: &str,
        target_lang: &str,
        deadline: Instant,
    ) -> Result<PipelineResult, PipelineError> {
        tokio::time::timeout_at(deadline, self.run(image_url, source_lang, target_lang))
            .await
            .map_err(|_| PipelineError::DeadlineExceeded)?
    }
}

pub fn validate_image_url(image_url: &str) -> Result<Url, PipelineError> {
    let trimmed = image_url.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Validation(
            "image_url is required".to_string(),
        ));
    }
    Url::parse(trimmed)
        .map_err(|err| PipelineError::Validation(format!("invalid image_url: {}", err)))
}

/// Index 0 is the full text, index `i + 1` is `units[i]`.
pub fn build_translation_batch(recognition: &RecognitionResult) -> Vec<String> {
    std::iter::once(recognition.full_text.clone())
        .chain(recognition.units.iter().map(|unit| unit.text.clone()))
        .collect()
}

/// Pairs each unit with its translation by position.
pub fn zip_overlays(
    units: &[RecognizedUnit],
    translations: &[TranslationResult],
) -> Result<Vec<OverlaySpec>, TranslationError> {
    if units.len() != translations.len() {
        return Err(TranslationError::LengthMismatch {
            expected: units.len(),
            actual: translations.len(),
        });
    }
    Ok(units
        .iter()
        .zip(translations)
        .map(|(unit, translation)| OverlaySpec {
            bounds: unit.bounds,
            replacement_text: translation.translated.clone(),
        })
        .collect())
}
