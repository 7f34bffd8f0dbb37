use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::geom::Rect;
use crate::pipeline::{PipelineItem, PipelineResult};

pub const STATUS_COMPLETED: &str = "translation_completed";

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
}

fn default_source_lang() -> String {
    "auto".to_string()
}

fn default_target_lang() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub status: String,
    pub original_full_text: String,
    pub translated_full_text: String,
    pub processed_image: String,
    pub text_blocks: Vec<TextBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub original_text: String,
    pub translated_text: String,
    pub confidence: f32,
    pub bounds: BoundsPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundsPayload {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl From<Rect> for BoundsPayload {
    fn from(rect: Rect) -> Self {
        Self {
            x1: rect.min_x,
            y1: rect.min_y,
            x2: rect.max_x,
            y2: rect.max_y,
        }
    }
}

impl From<&PipelineItem> for TextBlock {
    fn from(item: &PipelineItem) -> Self {
        Self {
            original_text: item.original_text.clone(),
            translated_text: item.translated_text.clone(),
            confidence: item.confidence,
            bounds: item.bounds.into(),
        }
    }
}

impl From<&PipelineResult> for TranslateResponse {
    fn from(result: &PipelineResult) -> Self {
        Self {
            status: STATUS_COMPLETED.to_string(),
            original_full_text: result.original_full_text.clone(),
            translated_full_text: result.translated_full_text.clone(),
            processed_image: BASE64.encode(&result.composed_image),
            text_blocks: result.items.iter().map(TextBlock::from).collect(),
        }
    }
}
