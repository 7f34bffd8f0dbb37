use ab_glyph::{FontArc, FontVec};
use anyhow::{Context, Result, anyhow};
use std::path::Path;
use tracing::debug;

/// DejaVu Sans Mono, bundled so overlays never depend on host fonts.
/// Licence: `assets/fonts/LICENSE-DejaVu.txt`.
static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

pub fn embedded_font() -> Result<FontArc> {
    FontArc::try_from_slice(EMBEDDED_FONT)
        .map_err(|err| anyhow!("failed to parse embedded font ({})", err))
}

pub fn load_font(path: &Path) -> Result<FontArc> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    FontVec::try_from_vec(data)
        .map(FontArc::new)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

/// The configured font file, or the embedded face when none is configured.
/// A configured path that cannot be loaded is an error.
pub fn resolve_overlay_font(font_path: Option<&Path>) -> Result<FontArc> {
    match font_path {
        Some(path) => {
            let font = load_font(path)?;
            debug!(font = %path.display(), "loaded overlay font");
            Ok(font)
        }
        None => embedded_font(),
    }
}
