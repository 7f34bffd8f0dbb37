use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::time::Instant;
use tracing::info;

pub mod error;
pub mod fetch;
pub mod geom;
pub mod languages;
pub mod logging;
pub mod ocr;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod settings;
pub mod translation;

pub use error::{ErrorKind, PipelineError};
pub use fetch::{HttpFetcher, ImageFetcher};
pub use ocr::{GoogleVision, Recognizer, VisionClient};
pub use pipeline::{Pipeline, PipelineItem, PipelineResult};
pub use translation::{GoogleTranslate, TranslationEngine, Translator};

pub type GooglePipeline = Pipeline<HttpFetcher, GoogleVision, GoogleTranslate>;

#[derive(Debug, Clone)]
pub struct Config {
    pub image_url: String,
    pub lang: String,
    pub source_lang: String,
    pub out: Option<PathBuf>,
    pub json: bool,
    pub settings_path: Option<String>,
}

/// Builds the production pipeline: HTTP fetcher, Google Vision and Google
/// Translate clients sharing one connection pool.
pub fn build_pipeline(settings: &settings::Settings) -> Result<GooglePipeline> {
    let client = reqwest::Client::builder()
        .build()
        .with_context(|| "failed to build HTTP client")?;

    let mut vision = GoogleVision::new(settings.vision_api_key()?).with_client(client.clone());
    if let Some(endpoint) = settings.vision_endpoint.as_deref() {
        vision = vision.with_endpoint(endpoint);
    }
    let mut translate =
        GoogleTranslate::new(settings.translate_api_key()?).with_client(client.clone());
    if let Some(endpoint) = settings.translate_endpoint.as_deref() {
        translate = translate.with_endpoint(endpoint);
    }
    let fetcher = HttpFetcher::new()
        .with_client(client)
        .with_max_bytes(settings.fetch_max_bytes);

    Ok(Pipeline::new(fetcher, Recognizer::new(vision), Translator::new(translate))
        .with_style(settings.overlay_style()?)
        .with_allow_empty(settings.allow_empty))
}

/// Runs one image through the pipeline and returns what the CLI prints.
pub async fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let pipeline = build_pipeline(&settings)?;

    let result = match settings.request_timeout {
        Some(timeout) => {
            pipeline
                .run_with_deadline(
                    &config.image_url,
                    &config.source_lang,
                    &config.lang,
                    Instant::now() + timeout,
                )
                .await?
        }
        None => {
            pipeline
                .run(&config.image_url, &config.source_lang, &config.lang)
                .await?
        }
    };

    if let Some(out) = config.out.as_deref() {
        std::fs::write(out, &result.composed_image)
            .with_context(|| format!("failed to write image: {}", out.display()))?;
        info!(path = %out.display(), "wrote translated image");
    }

    format_output(&result, config.json)
}

fn format_output(result: &PipelineResult, json: bool) -> Result<String> {
    if json {
        let payload = server::TranslateResponse::from(result);
        return serde_json::to_string_pretty(&payload)
            .with_context(|| "failed to serialize result");
    }
    Ok(result.translated_full_text.clone())
}
