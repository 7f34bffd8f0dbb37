#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use image_text_translator::error::{FetchError, TranslationError};
use image_text_translator::fetch::{FetchFuture, ImageFetcher};
use image_text_translator::languages::LanguageTag;
use image_text_translator::ocr::{TextAnnotation, VisionClient, VisionFuture};
use image_text_translator::translation::{TranslateFuture, TranslationEngine};
use image_text_translator::{Pipeline, Recognizer, Translator};
use reqwest::Url;
use serde_json::json;

pub type FakePipeline = Pipeline<FakeFetcher, FakeVision, FakeEngine>;

pub fn white_png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

pub fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

/// One page, one block, one paragraph; each word is `(text, confidence, [x1, y1, x2, y2])`.
pub fn annotation(full_text: &str, words: &[(&str, f32, [i32; 4])]) -> TextAnnotation {
    let words = words
        .iter()
        .map(|(text, confidence, [x1, y1, x2, y2])| {
            let symbols = text
                .chars()
                .map(|ch| json!({ "text": ch.to_string() }))
                .collect::<Vec<_>>();
            json!({
                "boundingBox": { "vertices": [
                    { "x": x1, "y": y1 },
                    { "x": x2, "y": y1 },
                    { "x": x2, "y": y2 },
                    { "x": x1, "y": y2 }
                ]},
                "symbols": symbols,
                "confidence": confidence
            })
        })
        .collect::<Vec<_>>();
    serde_json::from_value(json!({
        "text": full_text,
        "pages": [{ "blocks": [{ "paragraphs": [{ "words": words }] }] }]
    }))
    .unwrap()
}

#[derive(Clone, Default)]
pub struct FakeFetcher {
    pub bytes: Vec<u8>,
    pub delay: Option<Duration>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeFetcher {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageFetcher for FakeFetcher {
    fn fetch<'a>(&'a self, _url: &'a Url) -> FetchFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.bytes.is_empty() {
                return Err(FetchError::Status(404));
            }
            Ok(self.bytes.clone())
        })
    }
}

#[derive(Clone, Default)]
pub struct FakeVision {
    pub annotation: Option<TextAnnotation>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeVision {
    pub fn new(annotation: Option<TextAnnotation>) -> Self {
        Self {
            annotation,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VisionClient for FakeVision {
    fn detect<'a>(&'a self, _image_bytes: &'a [u8]) -> VisionFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let annotation = self.annotation.clone();
        Box::pin(async move { Ok(annotation) })
    }
}

/// Translates through a fixed dictionary; unknown inputs come back reversed.
#[derive(Clone, Default)]
pub struct FakeEngine {
    pub dictionary: HashMap<String, String>,
    pub drop_last: bool,
    pub calls: Arc<AtomicUsize>,
    pub batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeEngine {
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        Self {
            dictionary: entries
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

impl TranslationEngine for FakeEngine {
    fn translate<'a>(
        &'a self,
        texts: &'a [String],
        _target: &'a LanguageTag,
        _source: Option<&'a LanguageTag>,
    ) -> TranslateFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(texts.to_vec());
        Box::pin(async move {
            let mut translated = texts
                .iter()
                .map(|text| {
                    self.dictionary
                        .get(text)
                        .cloned()
                        .unwrap_or_else(|| text.chars().rev().collect())
                })
                .collect::<Vec<_>>();
            if self.drop_last {
                translated.pop();
            }
            Ok::<_, TranslationError>(translated)
        })
    }
}

pub fn pipeline(fetcher: &FakeFetcher, vision: &FakeVision, engine: &FakeEngine) -> FakePipeline {
    Pipeline::new(
        fetcher.clone(),
        Recognizer::new(vision.clone()),
        Translator::new(engine.clone()),
    )
}

pub fn hello_pipeline() -> (FakeFetcher, FakeVision, FakeEngine) {
    (
        FakeFetcher::new(white_png(64, 32)),
        FakeVision::new(Some(annotation("HELLO", &[("HELLO", 0.99, [0, 0, 50, 20])]))),
        FakeEngine::with_entries(&[("HELLO", "HOLA")]),
    )
}
