//! Rasterization of a [`ProfileDocument`] into an opaque RGB image.
//!
//! [`GlyphRasterizer`] lays the document out the way the viewer shows it (a
//! centred title with an accent bar, one shaded card per field and a footer)
//! and draws the text with `rusttype`.  All lengths below are in base pixels
//! and are multiplied by [`CaptureOptions::scale`].

use std::path::PathBuf;

use image::{DynamicImage, Rgb, RgbImage};
use log::debug;
use once_cell::unsync::OnceCell;
use rusttype::{point, Font, Scale};
use thiserror::Error;

use crate::document::{ProfileDocument, ValueStyle};
use crate::fonts::{self, FontError, RasterFaces};

const BASE_WIDTH: f32 = 800.0;
const PADDING: f32 = 32.0;
const TITLE_SIZE: f32 = 36.0;
const ACCENT_WIDTH: f32 = 96.0;
const ACCENT_HEIGHT: f32 = 4.0;
const SECTION_GAP: f32 = 24.0;
const RULE_HEIGHT: f32 = 1.0;
const CARD_PADDING: f32 = 24.0;
const LABEL_SIZE: f32 = 18.0;
const LABEL_GAP: f32 = 8.0;
const PROMINENT_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 14.0;
const FOOTER_SIZE: f32 = 14.0;
const LINE_HEIGHT: f32 = 1.5;

/// Longest side of a capture in device pixels.
pub const MAX_CAPTURE_SIDE: u32 = 32_767;
/// Largest capture area in device pixels (about 200 MB of RGB data).
pub const MAX_CAPTURE_PIXELS: u64 = 1 << 26;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const HEADING: Rgb<u8> = Rgb([31, 41, 55]);
const BODY: Rgb<u8> = Rgb([75, 85, 99]);
const MUTED: Rgb<u8> = Rgb([107, 114, 128]);
const CARD: Rgb<u8> = Rgb([249, 250, 251]);
const RULE: Rgb<u8> = Rgb([229, 231, 235]);
const ACCENT: Rgb<u8> = Rgb([22, 163, 74]);

/// Options of a capture.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureOptions {
    /// Device pixels per base pixel.
    pub scale: f32,
    /// Colour of every pixel nothing is drawn on.
    pub background: Rgb<u8>,
    /// Whether images from other origins may be drawn. The glyph rasterizer
    /// draws no external images, so the flag only matters to other rasterizers.
    pub allow_cross_origin: bool,
    /// Emit layout diagnostics through the `log` facade.
    pub logging: bool,
    /// Capture width in base pixels, the natural content width when `None`.
    pub width: Option<u32>,
    /// Capture height in base pixels, the natural content height when `None`.
    pub height: Option<u32>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: WHITE,
            allow_cross_origin: true,
            logging: false,
            width: None,
            height: None,
        }
    }
}

/// Failures while capturing.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to load fonts for rasterization")]
    Fonts(#[from] FontError),
    #[error("capture scale must be a positive number, got {0}")]
    InvalidScale(f32),
    #[error("capture area {width}x{height} has no pixels")]
    EmptyArea { width: u32, height: u32 },
    #[error("capture area {width}x{height} exceeds the {MAX_CAPTURE_SIDE} px side or {MAX_CAPTURE_PIXELS} px area limit")]
    TooLarge { width: u32, height: u32 },
}

/// Produces an image of a rendered document.
pub trait Rasterizer {
    fn capture(
        &self,
        document: &ProfileDocument,
        options: &CaptureOptions,
    ) -> Result<DynamicImage, CaptureError>;
}

impl<R: Rasterizer + ?Sized> Rasterizer for &R {
    fn capture(
        &self,
        document: &ProfileDocument,
        options: &CaptureOptions,
    ) -> Result<DynamicImage, CaptureError> {
        (**self).capture(document, options)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
}

#[derive(Clone, Debug, PartialEq)]
enum Paint {
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb<u8>,
    },
    Text {
        x: f32,
        baseline: f32,
        size: f32,
        face: Face,
        color: Rgb<u8>,
        text: String,
    },
}

struct Layout {
    width: f32,
    height: f32,
    paints: Vec<Paint>,
}

/// Draws documents with the bundled Roboto faces.
///
/// Fonts are loaded on the first capture, so a missing font directory shows up
/// as a capture failure.
pub struct GlyphRasterizer {
    fonts_dir: Option<PathBuf>,
    faces: OnceCell<RasterFaces>,
}

impl Default for GlyphRasterizer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl GlyphRasterizer {
    /// Creates a rasterizer searching `fonts_dir` before the default font paths.
    pub fn new(fonts_dir: Option<PathBuf>) -> Self {
        Self {
            fonts_dir,
            faces: OnceCell::new(),
        }
    }

    /// Creates a rasterizer from already loaded faces.
    pub fn with_faces(faces: RasterFaces) -> Self {
        Self {
            fonts_dir: None,
            faces: OnceCell::from(faces),
        }
    }

    fn faces(&self) -> Result<&RasterFaces, FontError> {
        self.faces
            .get_or_try_init(|| fonts::load_raster_faces(self.fonts_dir.as_deref()))
    }
}

impl Rasterizer for GlyphRasterizer {
    fn capture(
        &self,
        document: &ProfileDocument,
        options: &CaptureOptions,
    ) -> Result<DynamicImage, CaptureError> {
        if !(options.scale.is_finite() && options.scale > 0.0) {
            return Err(CaptureError::InvalidScale(options.scale));
        }

        let faces = self.faces()?;
        let layout = layout_document(faces, document, options.scale);

        let width = options
            .width
            .map(|width| (width as f32 * options.scale).round() as u32)
            .unwrap_or_else(|| layout.width.ceil() as u32);
        let height = options
            .height
            .map(|height| (height as f32 * options.scale).round() as u32)
            .unwrap_or_else(|| layout.height.ceil() as u32);
        check_capture_area(width, height)?;

        if options.logging {
            debug!(
                "capturing {} paint operations into {}x{} px at scale {}",
                layout.paints.len(),
                width,
                height,
                options.scale
            );
        }

        let mut canvas = RgbImage::from_pixel(width, height, options.background);
        for paint in &layout.paints {
            paint_onto(&mut canvas, faces, paint);
        }

        Ok(DynamicImage::ImageRgb8(canvas))
    }
}

fn check_capture_area(width: u32, height: u32) -> Result<(), CaptureError> {
    if width == 0 || height == 0 {
        return Err(CaptureError::EmptyArea { width, height });
    }
    if width > MAX_CAPTURE_SIDE
        || height > MAX_CAPTURE_SIDE
        || u64::from(width) * u64::from(height) > MAX_CAPTURE_PIXELS
    {
        return Err(CaptureError::TooLarge { width, height });
    }
    Ok(())
}

fn font_for(faces: &RasterFaces, face: Face) -> &Font<'static> {
    match face {
        Face::Regular => &faces.regular,
        Face::Bold => &faces.bold,
    }
}

fn text_width(font: &Font<'_>, size: f32, text: &str) -> f32 {
    font.layout(text, Scale::uniform(size), point(0.0, 0.0))
        .last()
        .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

/// Offset from the top of a line box to the baseline.
fn baseline_offset(font: &Font<'_>, size: f32) -> f32 {
    let metrics = font.v_metrics(Scale::uniform(size));
    let glyph_height = metrics.ascent - metrics.descent;
    (size * LINE_HEIGHT - glyph_height) / 2.0 + metrics.ascent
}

/// Breaks `text` into lines no wider than `max_width`.
///
/// Explicit line breaks are kept, consecutive spaces survive inside a line, and
/// a word wider than a whole line is split between characters.
fn wrap_text(measure: impl Fn(&str) -> f32, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
        let mut current: Option<String> = None;

        for word in paragraph.split(' ') {
            let candidate = match &current {
                Some(line) => format!("{line} {word}"),
                None => word.to_owned(),
            };

            if measure(&candidate) <= max_width {
                current = Some(candidate);
                continue;
            }

            if let Some(line) = current.take() {
                lines.push(line);
            }

            let mut piece = String::new();
            for ch in word.chars() {
                piece.push(ch);
                if measure(&piece) > max_width && piece.chars().count() > 1 {
                    piece.pop();
                    lines.push(std::mem::take(&mut piece));
                    piece.push(ch);
                }
            }
            current = Some(piece);
        }

        lines.push(current.unwrap_or_default());
    }

    lines
}

struct Cursor<'a> {
    faces: &'a RasterFaces,
    scale: f32,
    y: f32,
    paints: Vec<Paint>,
}

impl Cursor<'_> {
    fn px(&self, base: f32) -> f32 {
        base * self.scale
    }

    fn advance(&mut self, base: f32) {
        self.y += self.px(base);
    }

    fn fill(&mut self, x: f32, width: f32, height: f32, color: Rgb<u8>) {
        self.paints.push(Paint::Fill {
            x,
            y: self.y,
            width,
            height,
            color,
        });
    }

    /// Emits `text` wrapped to `width` starting at `x`, centred when asked.
    fn text(&mut self, x: f32, width: f32, size: f32, face: Face, color: Rgb<u8>, text: &str, centred: bool) {
        let font = font_for(self.faces, face);
        let size = self.px(size);
        let line_height = size * LINE_HEIGHT;
        let baseline = baseline_offset(font, size);

        for line in wrap_text(|s| text_width(font, size, s), text, width) {
            let line_x = if centred {
                x + (width - text_width(font, size, &line)).max(0.0) / 2.0
            } else {
                x
            };
            self.paints.push(Paint::Text {
                x: line_x,
                baseline: self.y + baseline,
                size,
                face,
                color,
                text: line,
            });
            self.y += line_height;
        }
    }
}

fn layout_document(faces: &RasterFaces, document: &ProfileDocument, scale: f32) -> Layout {
    let mut cursor = Cursor {
        faces,
        scale,
        y: 0.0,
        paints: Vec::new(),
    };

    let width = cursor.px(BASE_WIDTH);
    let left = cursor.px(PADDING);
    let inner = width - 2.0 * left;

    cursor.advance(PADDING);
    cursor.text(left, inner, TITLE_SIZE, Face::Bold, HEADING, document.title(), true);
    cursor.advance(LABEL_GAP);
    let accent_width = cursor.px(ACCENT_WIDTH);
    let accent_height = cursor.px(ACCENT_HEIGHT);
    cursor.fill((width - accent_width) / 2.0, accent_width, accent_height, ACCENT);
    cursor.advance(ACCENT_HEIGHT + SECTION_GAP);
    let rule = cursor.px(RULE_HEIGHT);
    cursor.fill(left, inner, rule, RULE);
    cursor.advance(RULE_HEIGHT + PADDING);

    for (index, block) in document.blocks().iter().enumerate() {
        if index > 0 {
            cursor.advance(SECTION_GAP);
        }

        let card_top = cursor.y;
        let card_index = cursor.paints.len();
        let text_left = left + cursor.px(CARD_PADDING);
        let content_width = inner - 2.0 * cursor.px(CARD_PADDING);

        cursor.advance(CARD_PADDING);
        cursor.text(text_left, content_width, LABEL_SIZE, Face::Bold, HEADING, block.label(), false);
        cursor.advance(LABEL_GAP);
        let value_size = match block.style() {
            ValueStyle::Prominent => PROMINENT_SIZE,
            ValueStyle::Preformatted => BODY_SIZE,
        };
        cursor.text(text_left, content_width, value_size, Face::Regular, BODY, block.value(), false);
        cursor.advance(CARD_PADDING);

        // The card background has to be painted before its text.
        cursor.paints.insert(
            card_index,
            Paint::Fill {
                x: left,
                y: card_top,
                width: inner,
                height: cursor.y - card_top,
                color: CARD,
            },
        );
    }

    cursor.advance(PADDING);
    cursor.fill(left, inner, rule, RULE);
    cursor.advance(RULE_HEIGHT + SECTION_GAP);
    cursor.text(left, inner, FOOTER_SIZE, Face::Regular, MUTED, &document.footer(), true);
    cursor.advance(PADDING);

    Layout {
        width,
        height: cursor.y,
        paints: cursor.paints,
    }
}

fn blend(pixel: &mut Rgb<u8>, color: Rgb<u8>, coverage: f32) {
    let coverage = coverage.clamp(0.0, 1.0);
    for (channel, target) in pixel.0.iter_mut().zip(color.0) {
        let mixed = *channel as f32 + (target as f32 - *channel as f32) * coverage;
        *channel = mixed.round().clamp(0.0, 255.0) as u8;
    }
}

fn paint_onto(canvas: &mut RgbImage, faces: &RasterFaces, paint: &Paint) {
    let (canvas_width, canvas_height) = canvas.dimensions();

    match paint {
        Paint::Fill {
            x,
            y,
            width,
            height,
            color,
        } => {
            let x0 = x.round().max(0.0) as u32;
            let y0 = y.round().max(0.0) as u32;
            let x1 = ((x + width).round().max(0.0) as u32).min(canvas_width);
            let y1 = ((y + height).round().max(0.0) as u32).min(canvas_height);
            for py in y0..y1 {
                for px in x0..x1 {
                    canvas.put_pixel(px, py, *color);
                }
            }
        }
        Paint::Text {
            x,
            baseline,
            size,
            face,
            color,
            text,
        } => {
            let font = font_for(faces, *face);
            for glyph in font.layout(text, Scale::uniform(*size), point(*x, *baseline)) {
                let Some(bounds) = glyph.pixel_bounding_box() else {
                    continue;
                };
                glyph.draw(|gx, gy, coverage| {
                    let px = bounds.min.x + gx as i32;
                    let py = bounds.min.y + gy as i32;
                    if px >= 0 && py >= 0 && (px as u32) < canvas_width && (py as u32) < canvas_height
                    {
                        blend(canvas.get_pixel_mut(px as u32, py as u32), *color, coverage);
                    }
                });
            }
        }
    }
}
