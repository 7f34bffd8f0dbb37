mod font;

use std::fmt;
use std::io::Cursor;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{ColorType, DynamicImage, ImageBuffer, ImageFormat, Pixel, Rgba};
use imageproc::definitions::Clamp;
use imageproc::drawing::draw_text_mut;
use tracing::{debug, warn};

use crate::error::ComposeError;
use crate::geom::Rect;

pub use font::{embedded_font, load_font, resolve_overlay_font};

/// ~50% opaque black.
pub const DEFAULT_PANEL_COLOR: Rgba<u8> = Rgba([0, 0, 0, 128]);
pub const DEFAULT_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const DEFAULT_FONT_SIZE: f32 = 13.0;

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpec {
    pub bounds: Rect,
    pub replacement_text: String,
}

#[derive(Clone)]
pub struct OverlayStyle {
    pub panel_color: Rgba<u8>,
    pub text_color: Rgba<u8>,
    pub font_size: f32,
    /// `None` paints panels only.
    pub font: Option<FontArc>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        let font = match embedded_font() {
            Ok(font) => Some(font),
            Err(err) => {
                warn!("{:#}; translated text will not be drawn", err);
                None
            }
        };
        Self {
            panel_color: DEFAULT_PANEL_COLOR,
            text_color: DEFAULT_TEXT_COLOR,
            font_size: DEFAULT_FONT_SIZE,
            font,
        }
    }
}

impl fmt::Debug for OverlayStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayStyle")
            .field("panel_color", &self.panel_color)
            .field("text_color", &self.text_color)
            .field("font_size", &self.font_size)
            .field("font", &self.font.is_some())
            .finish()
    }
}

/// Canvas pixel types the compositor paints on: 8-bit and 16-bit RGBA.
pub trait OverlayPixel: Pixel {
    fn from_rgba8(color: Rgba<u8>) -> Self;
}

impl OverlayPixel for Rgba<u8> {
    fn from_rgba8(color: Rgba<u8>) -> Self {
        color
    }
}

impl OverlayPixel for Rgba<u16> {
    fn from_rgba8(color: Rgba<u8>) -> Self {
        Rgba(color.0.map(|channel| u16::from(channel) * 257))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            ImageKind::Png => ImageFormat::Png,
            ImageKind::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |idx: usize| u8::from_str_radix(&hex[idx * 2..idx * 2 + 2], 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0u8, 0, 0, 255];
            for (idx, ch) in hex.chars().enumerate() {
                let nibble = ch.to_digit(16)? as u8;
                out[idx] = nibble * 17;
            }
            Some(Rgba(out))
        }
        6 => Some(Rgba([channel(0)?, channel(1)?, channel(2)?, 255])),
        8 => Some(Rgba([channel(0)?, channel(1)?, channel(2)?, channel(3)?])),
        _ => None,
    }
}

/// Detects the container from magic bytes; only PNG and JPEG are accepted.
pub fn detect_format(image_bytes: &[u8]) -> Result<ImageKind, ComposeError> {
    match image::guess_format(image_bytes) {
        Ok(ImageFormat::Png) => Ok(ImageKind::Png),
        Ok(ImageFormat::Jpeg) => Ok(ImageKind::Jpeg),
        Ok(other) => Err(ComposeError::UnsupportedFormat(
            other.to_mime_type().to_string(),
        )),
        Err(_) => Err(ComposeError::UnsupportedFormat("unrecognized data".to_string())),
    }
}

/// Decodes `image_bytes`, applies every overlay in order and re-encodes in the
/// detected container format. With no overlays the input bytes come back
/// unchanged once they are known to decode.
pub fn compose_overlay(
    image_bytes: &[u8],
    overlays: &[OverlaySpec],
    style: &OverlayStyle,
) -> Result<Vec<u8>, ComposeError> {
    let kind = detect_format(image_bytes)?;
    debug!(format = kind.mime(), overlays = overlays.len(), "composing overlays");
    let decoded = image::load_from_memory_with_format(image_bytes, kind.format())
        .map_err(|err| ComposeError::Decode(err.to_string()))?;
    if overlays.is_empty() {
        return Ok(image_bytes.to_vec());
    }

    let color = decoded.color();
    let composed = if is_high_depth(color) {
        let mut canvas = decoded.to_rgba16();
        compose_raster(&mut canvas, overlays, style);
        DynamicImage::ImageRgba16(canvas)
    } else {
        let mut canvas = decoded.to_rgba8();
        compose_raster(&mut canvas, overlays, style);
        DynamicImage::ImageRgba8(canvas)
    };
    encode(composed, kind, color.has_alpha())
}

/// Paints each overlay onto the raster: an occlusion panel over `bounds`, then
/// the replacement text left-aligned with its baseline near the top edge.
/// Later overlays draw over earlier ones where they intersect. Boxes that miss
/// the canvas or have no area are skipped, text included.
pub fn compose_raster<P>(
    canvas: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    overlays: &[OverlaySpec],
    style: &OverlayStyle,
) where
    P: OverlayPixel,
    P::Subpixel: Into<f32> + Clamp<f32>,
{
    let panel = P::from_rgba8(style.panel_color);
    let text_color = P::from_rgba8(style.text_color);
    for overlay in overlays {
        let Some(area) = overlay.bounds.clip_to(canvas.width(), canvas.height()) else {
            continue;
        };
        paint_panel(canvas, &area, panel);
        if let Some(font) = style.font.as_ref() {
            draw_label(canvas, overlay, font, style.font_size, text_color);
        }
    }
}

fn paint_panel<P: Pixel>(canvas: &mut ImageBuffer<P, Vec<P::Subpixel>>, area: &Rect, color: P) {
    for y in area.min_y..area.max_y {
        for x in area.min_x..area.max_x {
            canvas.get_pixel_mut(x as u32, y as u32).blend(&color);
        }
    }
}

fn draw_label<P>(
    canvas: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    overlay: &OverlaySpec,
    font: &FontArc,
    font_size: f32,
    color: P,
) where
    P: Pixel,
    P::Subpixel: Into<f32> + Clamp<f32>,
{
    let text = overlay
        .replacement_text
        .replace(|ch: char| ch.is_control(), " ");
    if text.trim().is_empty() {
        return;
    }
    let scale = PxScale::from(font_size);
    let ascent = font.as_scaled(scale).ascent().round() as i32;
    let top = overlay.bounds.min_y + baseline_offset(font_size) - ascent;
    draw_text_mut(canvas, color, overlay.bounds.min_x, top, scale, font, &text);
}

// 12px below the top edge for the default 13px face.
fn baseline_offset(font_size: f32) -> i32 {
    (font_size.round() as i32 - 1).max(0)
}

fn is_high_depth(color: ColorType) -> bool {
    matches!(
        color,
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16
    )
}

fn encode(image: DynamicImage, kind: ImageKind, keep_alpha: bool) -> Result<Vec<u8>, ComposeError> {
    let output = match kind {
        ImageKind::Png if keep_alpha => image,
        ImageKind::Png if is_high_depth(image.color()) => DynamicImage::ImageRgb16(image.to_rgb16()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    };
    let mut bytes = Vec::new();
    output
        .write_to(&mut Cursor::new(&mut bytes), kind.format())
        .map_err(|err| ComposeError::Encoding(err.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage, RgbaImage};

    fn overlay(min_x: i32, min_y: i32, max_x: i32, max_y: i32, text: &str) -> OverlaySpec {
        OverlaySpec {
            bounds: Rect::new(min_x, min_y, max_x, max_y),
            replacement_text: text.to_string(),
        }
    }

    fn encoded(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), format)
            .expect("encode fixture");
        bytes
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#00000080"), Some(DEFAULT_PANEL_COLOR));
        assert_eq!(parse_hex_color("#ffffff"), Some(DEFAULT_TEXT_COLOR));
        assert_eq!(parse_hex_color("#f00"), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(parse_hex_color("ffffff"), None);
        assert_eq!(parse_hex_color("#ggg"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn zero_overlays_leave_raster_untouched() {
        let original = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));
        let mut canvas = original.clone();
        compose_raster(&mut canvas, &[], &OverlayStyle::default());
        assert_eq!(canvas, original);
    }

    #[test]
    fn panel_covers_exactly_the_bounds() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        compose_raster(&mut canvas, &[overlay(2, 3, 5, 6, "")], &OverlayStyle::default());
        for (x, y, pixel) in canvas.enumerate_pixels() {
            let inside = (2..5).contains(&x) && (3..6).contains(&y);
            if inside {
                assert!((126..=128).contains(&pixel[0]), "({x},{y}) = {pixel:?}");
                assert_eq!(pixel[3], 255);
            } else {
                assert_eq!(*pixel, Rgba([255, 255, 255, 255]), "({x},{y}) changed");
            }
        }
    }

    #[test]
    fn overlapping_panels_stack_in_order() {
        let mut canvas = RgbaImage::from_pixel(10, 4, Rgba([200, 200, 200, 255]));
        compose_raster(
            &mut canvas,
            &[overlay(0, 0, 6, 4, ""), overlay(4, 0, 10, 4, "")],
            &OverlayStyle::default(),
        );
        let single = canvas.get_pixel(1, 1)[0];
        let double = canvas.get_pixel(5, 1)[0];
        assert!(double < single);
        assert_eq!(canvas.get_pixel(8, 1)[0], single);
    }

    #[test]
    fn out_of_canvas_and_degenerate_bounds_are_ignored() {
        let original = RgbaImage::from_pixel(6, 6, Rgba([90, 90, 90, 255]));
        let mut canvas = original.clone();
        compose_raster(
            &mut canvas,
            &[
                overlay(-20, -20, -2, -2, "gone"),
                overlay(40, 40, 60, 60, "gone"),
                overlay(3, 3, 3, 5, "flat"),
            ],
            &OverlayStyle::default(),
        );
        assert_eq!(canvas, original);
    }

    #[test]
    fn partially_outside_bounds_are_clipped() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        compose_raster(&mut canvas, &[overlay(-3, 2, 2, 9, "")], &OverlayStyle::default());
        assert!(canvas.get_pixel(0, 3)[0] < 255);
        assert!(canvas.get_pixel(1, 2)[0] < 255);
        assert_eq!(canvas.get_pixel(2, 2)[0], 255);
        assert_eq!(canvas.get_pixel(0, 1)[0], 255);
    }

    #[test]
    fn default_style_carries_the_embedded_font() {
        assert!(OverlayStyle::default().font.is_some());
    }

    #[test]
    fn replacement_text_is_drawn_with_the_default_style() {
        let mut canvas = RgbaImage::from_pixel(120, 30, Rgba([0, 0, 0, 255]));
        compose_raster(
            &mut canvas,
            &[overlay(4, 4, 100, 24, "HOLA MUNDO")],
            &OverlayStyle::default(),
        );
        let lit = (4..100)
            .flat_map(|x| (4..24).map(move |y| (x, y)))
            .filter(|&(x, y)| canvas.get_pixel(x, y)[0] > 128)
            .count();
        assert!(lit > 20, "only {lit} text pixels");
        assert_eq!(canvas.get_pixel(110, 2)[0], 0);
    }

    #[test]
    fn style_without_font_paints_panels_only() {
        let style = OverlayStyle {
            font: None,
            ..OverlayStyle::default()
        };
        let mut canvas = RgbaImage::from_pixel(60, 20, Rgba([255, 255, 255, 255]));
        compose_raster(&mut canvas, &[overlay(0, 0, 60, 20, "HOLA")], &style);
        assert!(canvas.pixels().all(|pixel| pixel[0] < 129));
    }

    #[test]
    fn sixteen_bit_png_without_overlays_is_returned_as_is() {
        let source = DynamicImage::ImageRgb16(ImageBuffer::from_fn(9, 5, |x, y| {
            Rgb([x as u16 * 7001, y as u16 * 13001, 65535 - x as u16 * 3])
        }));
        let bytes = encoded(source.clone(), ImageFormat::Png);
        let output = compose_overlay(&bytes, &[], &OverlayStyle::default()).unwrap();
        assert_eq!(output, bytes);
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb16);
        assert_eq!(decoded.to_rgb16(), source.to_rgb16());
    }

    #[test]
    fn sixteen_bit_png_keeps_depth_outside_overlays() {
        let source = DynamicImage::ImageRgb16(ImageBuffer::from_fn(20, 10, |x, y| {
            Rgb([x as u16 * 3001 + 1, y as u16 * 5003 + 7, 40_000])
        }));
        let bytes = encoded(source.clone(), ImageFormat::Png);
        let output =
            compose_overlay(&bytes, &[overlay(0, 0, 4, 4, "")], &OverlayStyle::default())
                .unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb16);
        let (before, after) = (source.to_rgb16(), decoded.to_rgb16());
        for (x, y, pixel) in after.enumerate_pixels() {
            if x < 4 && y < 4 {
                assert!(pixel[2] < before.get_pixel(x, y)[2]);
            } else {
                assert_eq!(pixel, before.get_pixel(x, y), "({x},{y}) changed");
            }
        }
    }

    #[test]
    fn sixteen_bit_gray_alpha_png_keeps_alpha_and_depth() {
        let source = DynamicImage::ImageLumaA16(ImageBuffer::from_fn(6, 6, |x, _| {
            image::LumaA([x as u16 * 10_000, 50_000])
        }));
        let bytes = encoded(source.clone(), ImageFormat::Png);
        let output =
            compose_overlay(&bytes, &[overlay(0, 0, 2, 2, "")], &OverlayStyle::default())
                .unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgba16);
        assert_eq!(
            decoded.to_rgba16().get_pixel(5, 5),
            source.to_rgba16().get_pixel(5, 5)
        );
    }

    #[test]
    fn png_without_overlays_round_trips_pixels() {
        let source = DynamicImage::ImageRgb8(gradient(17, 9));
        let bytes = encoded(source.clone(), ImageFormat::Png);
        let output = compose_overlay(&bytes, &[], &OverlayStyle::default()).unwrap();
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&output).unwrap();
        assert!(!decoded.color().has_alpha());
        assert_eq!(decoded.to_rgba8(), source.to_rgba8());
    }

    #[test]
    fn png_with_alpha_keeps_alpha() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 5, Rgba([1, 2, 3, 77])));
        let bytes = encoded(source.clone(), ImageFormat::Png);
        let output = compose_overlay(&bytes, &[], &OverlayStyle::default()).unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.to_rgba8(), source.to_rgba8());
    }

    #[test]
    fn jpeg_stays_jpeg() {
        let bytes = encoded(DynamicImage::ImageRgb8(gradient(32, 16)), ImageFormat::Jpeg);
        let output =
            compose_overlay(&bytes, &[overlay(0, 0, 16, 8, "x")], &OverlayStyle::default())
                .unwrap();
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&output).unwrap().dimensions(), (32, 16));
    }

    #[test]
    fn other_formats_are_unsupported() {
        let bmp = encoded(DynamicImage::ImageRgb8(gradient(4, 4)), ImageFormat::Bmp);
        match compose_overlay(&bmp, &[], &OverlayStyle::default()) {
            Err(ComposeError::UnsupportedFormat(name)) => assert_eq!(name, "image/bmp"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            compose_overlay(b"plain text", &[], &OverlayStyle::default()),
            Err(ComposeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn truncated_png_is_a_decode_error() {
        let mut bytes = encoded(DynamicImage::ImageRgb8(gradient(8, 8)), ImageFormat::Png);
        bytes.truncate(20);
        assert!(matches!(
            compose_overlay(&bytes, &[], &OverlayStyle::default()),
            Err(ComposeError::Decode(_))
        ));
    }
}
