use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::fetch::DEFAULT_MAX_BYTES;
use crate::render::{self, DEFAULT_FONT_SIZE, OverlayStyle};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
const DOTENV_CANDIDATES: &[&str] = &[".env", "../.env", "../../.env"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub request_timeout: Option<Duration>,
    pub vision_api_key: Option<String>,
    pub translate_api_key: Option<String>,
    pub vision_endpoint: Option<String>,
    pub translate_endpoint: Option<String>,
    pub fetch_max_bytes: u64,
    pub overlay_panel_color: String,
    pub overlay_text_color: String,
    pub overlay_font_size: f32,
    pub overlay_font_path: Option<String>,
    pub allow_empty: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:8080".to_string(),
            request_timeout: Some(Duration::from_secs(120)),
            vision_api_key: None,
            translate_api_key: None,
            vision_endpoint: None,
            translate_endpoint: None,
            fetch_max_bytes: DEFAULT_MAX_BYTES,
            overlay_panel_color: "#00000080".to_string(),
            overlay_text_color: "#ffffff".to_string(),
            overlay_font_size: DEFAULT_FONT_SIZE,
            overlay_font_path: None,
            allow_empty: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    google: Option<GoogleSettings>,
    fetch: Option<FetchSettings>,
    overlay: Option<OverlaySettings>,
    pipeline: Option<PipelineSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GoogleSettings {
    vision_api_key: Option<String>,
    translate_api_key: Option<String>,
    vision_endpoint: Option<String>,
    translate_endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FetchSettings {
    max_bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    panel_color: Option<String>,
    text_color: Option<String>,
    font_size: Option<f32>,
    font_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelineSettings {
    allow_empty: Option<bool>,
}

/// Loads the first `.env` found next to or above the working directory.
pub fn load_dotenv() {
    for candidate in DOTENV_CANDIDATES {
        if dotenvy::from_path(candidate).is_ok() {
            info!("loaded environment from {}", candidate);
            return;
        }
    }
    debug!(".env file not found; using process environment");
}

/// Built-in defaults, then `./settings.toml`, `./settings.local.toml`, the
/// same pair under `~/.image-text-translator/`, then `extra_path`. Environment
/// variables override the merged result.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    let mut settings = load_from_paths(&ordered_paths)?;
    settings.apply_env(|key| std::env::var(key).ok())?;
    Ok(settings)
}

fn load_from_paths(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            debug!(path = %path.display(), "merged settings file");
            settings.merge(parsed);
        }
    }
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = non_blank(server.addr) {
                self.server_addr = addr;
            }
            if let Some(secs) = server.request_timeout_secs {
                self.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
        }
        if let Some(google) = incoming.google {
            if let Some(key) = non_blank(google.vision_api_key) {
                self.vision_api_key = Some(key);
            }
            if let Some(key) = non_blank(google.translate_api_key) {
                self.translate_api_key = Some(key);
            }
            if let Some(endpoint) = non_blank(google.vision_endpoint) {
                self.vision_endpoint = Some(endpoint);
            }
            if let Some(endpoint) = non_blank(google.translate_endpoint) {
                self.translate_endpoint = Some(endpoint);
            }
        }
        if let Some(fetch) = incoming.fetch {
            if let Some(max_bytes) = fetch.max_bytes.filter(|value| *value > 0) {
                self.fetch_max_bytes = max_bytes;
            }
        }
        if let Some(overlay) = incoming.overlay {
            if let Some(color) = non_blank(overlay.panel_color) {
                self.overlay_panel_color = color;
            }
            if let Some(color) = non_blank(overlay.text_color) {
                self.overlay_text_color = color;
            }
            if let Some(size) = overlay.font_size.filter(|size| *size > 0.0) {
                self.overlay_font_size = size;
            }
            if let Some(path) = non_blank(overlay.font_path) {
                self.overlay_font_path = Some(path);
            }
        }
        if let Some(pipeline) = incoming.pipeline {
            if let Some(allow_empty) = pipeline.allow_empty {
                self.allow_empty = allow_empty;
            }
        }
    }

    /// `GOOGLE_VISION_API_KEY` / `GOOGLE_TRANSLATE_API_KEY` (each falling back
    /// to `GOOGLE_API_KEY`) and `PORT`.
    pub fn apply_env<L>(&mut self, lookup: L) -> Result<()>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(key) = get("GOOGLE_VISION_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.vision_api_key = Some(key);
        }
        if let Some(key) = get("GOOGLE_TRANSLATE_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.translate_api_key = Some(key);
        }
        if let Some(port) = get("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT '{}'", port))?;
            self.server_addr = replace_port(&self.server_addr, port);
        }
        Ok(())
    }

    pub fn vision_api_key(&self) -> Result<String> {
        self.vision_api_key
            .clone()
            .ok_or_else(|| anyhow!("GOOGLE_VISION_API_KEY is required"))
    }

    pub fn translate_api_key(&self) -> Result<String> {
        self.translate_api_key
            .clone()
            .ok_or_else(|| anyhow!("GOOGLE_TRANSLATE_API_KEY is required"))
    }

    pub fn overlay_style(&self) -> Result<OverlayStyle> {
        let panel_color = render::parse_hex_color(&self.overlay_panel_color).ok_or_else(|| {
            anyhow!("invalid overlay panel_color '{}'", self.overlay_panel_color)
        })?;
        let text_color = render::parse_hex_color(&self.overlay_text_color).ok_or_else(|| {
            anyhow!("invalid overlay text_color '{}'", self.overlay_text_color)
        })?;
        let font = render::resolve_overlay_font(self.overlay_font_path.as_deref().map(Path::new))?;
        Ok(OverlayStyle {
            panel_color,
            text_color,
            font_size: self.overlay_font_size,
            font: Some(font),
        })
    }
}

fn replace_port(addr: &str, port: u16) -> String {
    match addr.rsplit_once(':') {
        Some((host, _)) if !host.is_empty() => format!("{}:{}", host, port),
        _ => format!("0.0.0.0:{}", port),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".image-text-translator"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn embedded_defaults_match_struct_defaults() {
        let settings = load_from_paths(&[]).unwrap();
        assert_eq!(settings.server_addr, "0.0.0.0:8080");
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(120)));
        assert_eq!(settings.fetch_max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(settings.overlay_panel_color, "#00000080");
        assert_eq!(settings.overlay_font_size, 13.0);
        assert!(!settings.allow_empty);
        assert!(settings.vision_api_key.is_none());
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        fs::write(
            &first,
            "[server]\naddr = \"127.0.0.1:9000\"\nrequest_timeout_secs = 0\n[overlay]\ntext_color = \"#ff0000\"\n",
        )
        .unwrap();
        fs::write(
            &second,
            "[overlay]\ntext_color = \"#00ff00\"\n[pipeline]\nallow_empty = true\n[google]\nvision_api_key = \"  \"\n",
        )
        .unwrap();
        let settings =
            load_from_paths(&[first, dir.path().join("missing.toml"), second]).unwrap();
        assert_eq!(settings.server_addr, "127.0.0.1:9000");
        assert_eq!(settings.request_timeout, None);
        assert_eq!(settings.overlay_text_color, "#00ff00");
        assert!(settings.allow_empty);
        assert!(settings.vision_api_key.is_none());
    }

    #[test]
    fn malformed_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[server\n").unwrap();
        let err = load_from_paths(&[path.clone()]).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.toml"));
    }

    #[test]
    fn missing_extra_path_is_an_error() {
        let err = load_settings(Some(Path::new("/nonexistent/settings.toml"))).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }

    #[test]
    fn env_overrides_keys_and_port() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("GOOGLE_API_KEY", "shared"),
                ("GOOGLE_TRANSLATE_API_KEY", "translate-only"),
                ("PORT", "9090"),
            ]))
            .unwrap();
        assert_eq!(settings.vision_api_key.as_deref(), Some("shared"));
        assert_eq!(settings.translate_api_key.as_deref(), Some("translate-only"));
        assert_eq!(settings.server_addr, "0.0.0.0:9090");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut settings = Settings::default();
        assert!(settings.apply_env(env(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn missing_keys_name_the_variable() {
        let settings = Settings::default();
        assert_eq!(
            settings.vision_api_key().unwrap_err().to_string(),
            "GOOGLE_VISION_API_KEY is required"
        );
        assert_eq!(
            settings.translate_api_key().unwrap_err().to_string(),
            "GOOGLE_TRANSLATE_API_KEY is required"
        );
    }

    #[test]
    fn overlay_style_rejects_bad_colors() {
        let settings = Settings {
            overlay_text_color: "white".to_string(),
            ..Settings::default()
        };
        assert!(settings.overlay_style().is_err());
    }

    #[test]
    fn overlay_style_uses_embedded_font_unless_configured() {
        let style = Settings::default().overlay_style().unwrap();
        assert!(style.font.is_some());

        let settings = Settings {
            overlay_font_path: Some("/nonexistent/overlay.ttf".to_string()),
            ..Settings::default()
        };
        assert!(settings.overlay_style().is_err());
    }

    #[test]
    fn port_replacement_keeps_host() {
        assert_eq!(replace_port("127.0.0.1:8080", 3000), "127.0.0.1:3000");
        assert_eq!(replace_port("[::1]:8080", 3000), "[::1]:3000");
        assert_eq!(replace_port("localhost", 3000), "0.0.0.0:3000");
    }
}
