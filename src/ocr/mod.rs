mod annotation;
mod vision;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tracing::debug;

use crate::error::RecognitionError;
use crate::geom::{Rect, bounding_box_of};

pub use annotation::{Block, BoundingPoly, Page, Paragraph, Symbol, TextAnnotation, Vertex, Word};
pub use vision::GoogleVision;

/// One detected span of text, in document reading order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedUnit {
    pub text: String,
    pub confidence: f32,
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    /// Prose for the whole image; not a join of `units`.
    pub full_text: String,
    pub units: Vec<RecognizedUnit>,
}

pub type VisionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<TextAnnotation>, RecognitionError>> + Send + 'a>>;

/// Boundary to the external recognition engine.
pub trait VisionClient: Send + Sync {
    /// Resolves to `None` when the engine reports no text annotation at all.
    fn detect<'a>(&'a self, image_bytes: &'a [u8]) -> VisionFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct Recognizer<C> {
    client: C,
}

impl<C: VisionClient> Recognizer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn extract_text(
        &self,
        image_bytes: &[u8],
    ) -> Result<RecognitionResult, RecognitionError> {
        let annotation = self
            .client
            .detect(image_bytes)
            .await?
            .ok_or(RecognitionError::NoText)?;
        let units = flatten_words(&annotation);
        if annotation.text.trim().is_empty() && units.is_empty() {
            return Err(RecognitionError::NoText);
        }
        debug!(
            pages = annotation.pages.len(),
            units = units.len(),
            "flattened text annotation"
        );
        Ok(RecognitionResult {
            full_text: annotation.text,
            units,
        })
    }
}

/// Walks pages, blocks, paragraphs and words in engine order and yields one
/// unit per word with its symbols joined.
pub fn flatten_words(annotation: &TextAnnotation) -> Vec<RecognizedUnit> {
    annotation
        .pages
        .iter()
        .flat_map(|page| page.blocks.iter())
        .flat_map(|block| block.paragraphs.iter())
        .flat_map(|paragraph| paragraph.words.iter())
        .filter_map(|word| {
            let text = word.text();
            if text.is_empty() {
                return None;
            }
            Some(RecognizedUnit {
                text,
                confidence: clamp_confidence(word.confidence),
                bounds: bounding_box_of(&word.vertices()),
            })
        })
        .collect()
}

fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
