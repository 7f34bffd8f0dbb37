use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;

use image_text_translator::{Config, logging, server, settings};

#[derive(Parser, Debug)]
#[command(
    name = "image-text-translator",
    version,
    about = "Detect text in an image, translate it and paint the translation over the original"
)]
struct Cli {
    /// Image URL (http or https)
    #[arg(short = 'u', long = "image-url")]
    image_url: Option<String>,

    /// Target language as a BCP 47 tag (default: en)
    #[arg(short = 'l', long = "lang", default_value = "en")]
    lang: String,

    /// Source language. Use "auto" to detect.
    #[arg(short = 'L', long = "source-lang", default_value = "auto")]
    source_lang: String,

    /// Write the translated image to this path
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,

    /// Print the full JSON payload instead of the translated text
    #[arg(long = "json")]
    json: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Start the HTTP server (default address from settings)
    #[arg(long = "server", num_args = 0..=1, default_missing_value = "")]
    server: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    settings::load_dotenv();

    if let Some(addr) = cli.server {
        let settings_path = cli.read_settings.as_deref().map(std::path::Path::new);
        let settings = settings::load_settings(settings_path)?;
        let addr = if addr.trim().is_empty() {
            settings.server_addr.clone()
        } else {
            addr
        };
        return server::run_server(settings, addr).await;
    }

    let image_url = cli
        .image_url
        .ok_or_else(|| anyhow!("--image-url is required (or use --server)"))?;
    let output = image_text_translator::run(Config {
        image_url,
        lang: cli.lang,
        source_lang: cli.source_lang,
        out: cli.out,
        json: cli.json,
        settings_path: cli.read_settings,
    })
    .await?;
    println!("{}", output);
    Ok(())
}
