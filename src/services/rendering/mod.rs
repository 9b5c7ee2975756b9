use cosmic_text::{
    fontdb, Attrs, Buffer, Color as CosmicColor, Family, FontSystem, Metrics, Shaping, SwashCache,
};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut, Blend, Canvas};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::core::errors::{RenderingError, RenderingResult};
use crate::core::types::{Detection, Point, Quad};
use crate::services::layout::{Connector, LayoutOptions, Placement};

/// Dash pattern for connectors, in pixels
const DASH_LENGTH: f32 = 6.0;
const DASH_GAP: f32 = 4.0;
/// Numbers are shrunk to fit within this share of the marker diameter
const NUMBER_FILL_RATIO: f32 = 0.8;

/// Map an alpha given either as a fraction in [0, 1] or a byte value in
/// [0, 255] to a byte.
pub fn normalize_alpha(alpha: f32) -> u8 {
    if !alpha.is_finite() || alpha <= 0.0 {
        0
    } else if alpha <= 1.0 {
        (alpha * 255.0).round() as u8
    } else {
        alpha.round().min(255.0) as u8
    }
}

/// Font compiled into the binary; used when no font file is configured or it fails to load
static EMBEDDED_FONT: &[u8] = include_bytes!("../../../assets/DejaVuSansMono.ttf");

/// Shaped text via cosmic-text, backed by a single font
pub struct ShapedFont {
    font_system: FontSystem,
    swash_cache: SwashCache,
    family: String,
    embedded: bool,
}

impl ShapedFont {
    /// Load a TTF/OTF file into an isolated font database (no system font scan)
    pub fn load(path: &Path) -> RenderingResult<Self> {
        let font_data = std::fs::read(path)
            .map_err(|e| RenderingError::FontLoadError(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(font_data, &path.display().to_string())
    }

    /// The bundled DejaVu Sans Mono
    pub fn embedded() -> RenderingResult<Self> {
        let mut font = Self::from_bytes(EMBEDDED_FONT.to_vec(), "embedded DejaVu Sans Mono")?;
        font.embedded = true;
        Ok(font)
    }

    fn from_bytes(font_data: Vec<u8>, source: &str) -> RenderingResult<Self> {
        let mut db = fontdb::Database::new();
        db.load_font_data(font_data);

        let family = db
            .faces()
            .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
            .ok_or_else(|| RenderingError::FontNotFound {
                family: "<any>".to_string(),
                paths: vec![source.to_string()],
            })?;

        debug!("Font: {} from {}", family, source);

        Ok(Self {
            font_system: FontSystem::new_with_locale_and_db("en-US".to_string(), db),
            swash_cache: SwashCache::new(),
            family,
            embedded: false,
        })
    }

    /// Load `path` if given; a missing or unreadable file falls back to the
    /// embedded font.
    pub fn load_or_embedded(path: Option<&Path>) -> RenderingResult<Self> {
        match path {
            Some(path) => match Self::load(path) {
                Ok(font) => {
                    info!("✓ Number font: {} ({})", font.family, path.display());
                    Ok(font)
                }
                Err(e) => {
                    warn!("⚠ {}; using embedded font", e);
                    Self::embedded()
                }
            },
            None => Self::embedded(),
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    fn line_height(font_size: f32) -> f32 {
        font_size * 1.2
    }

    fn shape(&mut self, text: &str, font_size: f32) -> Buffer {
        let metrics = Metrics::new(font_size, Self::line_height(font_size));
        let mut buffer = Buffer::new(&mut self.font_system, metrics);

        let attrs = Attrs::new().family(Family::Name(&self.family));
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);
        buffer
    }

    /// Visual (width, height) from glyph bounds
    pub fn measure(&mut self, text: &str, font_size: f32) -> (f32, f32) {
        if text.trim().is_empty() {
            return (0.0, 0.0);
        }

        let buffer = self.shape(text, font_size);
        let mut lines = 0;
        let (min_x, max_x) = buffer
            .layout_runs()
            .inspect(|_| lines += 1)
            .flat_map(|run| run.glyphs.iter().map(|g| (g.x, g.x + g.w)))
            .fold((f32::MAX, f32::MIN), |(lo, hi), (x1, x2)| (lo.min(x1), hi.max(x2)));

        let width = if min_x == f32::MAX { 0.0 } else { max_x - min_x };
        (width, lines as f32 * Self::line_height(font_size))
    }

    /// Font size at which `text` is at most `max_width` wide
    pub fn fit_size(&mut self, text: &str, font_size: f32, max_width: f32) -> f32 {
        let (width, _) = self.measure(text, font_size);
        if width > max_width && width > 0.0 {
            (font_size * max_width / width).max(1.0)
        } else {
            font_size
        }
    }

    /// Draw `text` with its line box centered on `center`
    pub fn draw_centered(
        &mut self,
        canvas: &mut Blend<RgbaImage>,
        text: &str,
        font_size: f32,
        center: Point,
        color: Rgba<u8>,
    ) {
        let (width, height) = self.measure(text, font_size);
        let x = (center.x - width / 2.0).round() as i32;
        let y = (center.y - height / 2.0).round() as i32;

        let buffer = self.shape(text, font_size);
        let cosmic_color = CosmicColor::rgba(color[0], color[1], color[2], color[3]);
        let (cw, ch) = canvas.dimensions();

        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            cosmic_color,
            |px_x, px_y, w, h, pixel_color| {
                if pixel_color.a() == 0 {
                    return;
                }
                let rgba = Rgba([pixel_color.r(), pixel_color.g(), pixel_color.b(), pixel_color.a()]);
                for dy in 0..h as i32 {
                    for dx in 0..w as i32 {
                        let img_x = x + px_x + dx;
                        let img_y = y + px_y + dy;
                        if img_x >= 0 && img_y >= 0 && (img_x as u32) < cw && (img_y as u32) < ch {
                            canvas.draw_pixel(img_x as u32, img_y as u32, rgba);
                        }
                    }
                }
            },
        );
    }
}

/// Draws bubbles, connectors and numbers for one layout pass
pub struct MarkerRenderer {
    font: Option<ShapedFont>,
}

impl MarkerRenderer {
    pub fn new(font_path: Option<&Path>) -> Self {
        let font = ShapedFont::load_or_embedded(font_path)
            .inspect_err(|e| error!("✗ {}; bubbles will be drawn without numbers", e))
            .ok();
        Self { font }
    }

    /// Render `placements` onto a copy of `image`
    pub fn render(
        &mut self,
        image: &RgbaImage,
        detections: &[Detection],
        placements: &[Placement],
        options: &LayoutOptions,
    ) -> RgbaImage {
        let mut canvas = Blend(image.clone());
        let style = &options.style;
        let radius = options.effective_radius();

        if style.draw_quads {
            let color = style.quad();
            for quad in detections.iter().filter_map(|d| d.quad.as_ref()) {
                draw_quad(&mut canvas, quad, color);
            }
        }

        let fill = style.fill();
        let outline = style.outline();
        let connector_color = style.connector();
        let number_color = style.number();
        let font_size = options.font_size();
        let max_text_width = 2.0 * radius * NUMBER_FILL_RATIO;

        for placement in placements {
            if let Some(connector) = &placement.connector {
                draw_dashed_line(&mut canvas, connector, connector_color);
            }

            fill_circle(&mut canvas, placement.center, radius, fill);
            draw_hollow_circle_mut(
                &mut canvas,
                (placement.center.x.round() as i32, placement.center.y.round() as i32),
                radius.round() as i32,
                outline,
            );

            if let Some(font) = self.font.as_mut() {
                let label = placement.label();
                let size = font.fit_size(&label, font_size, max_text_width);
                font.draw_centered(&mut canvas, &label, size, placement.center, number_color);
            }
        }

        match &self.font {
            Some(font) => debug!(
                "Rendered {} bubbles ({}{})",
                placements.len(),
                font.family(),
                if font.is_embedded() { ", embedded" } else { "" }
            ),
            None => debug!("Rendered {} bubbles without numbers", placements.len()),
        }

        canvas.0
    }
}

/// Filled disc; each covered pixel is blended exactly once
fn fill_circle(canvas: &mut Blend<RgbaImage>, center: Point, radius: f32, color: Rgba<u8>) {
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let r_sq = radius * radius;
    let x0 = (center.x - radius).floor().max(0.0) as u32;
    let y0 = (center.y - radius).floor().max(0.0) as u32;
    let x1 = ((center.x + radius).ceil().max(0.0) as u32).min(w - 1);
    let y1 = ((center.y + radius).ceil().max(0.0) as u32).min(h - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            if dx * dx + dy * dy <= r_sq {
                canvas.draw_pixel(x, y, color);
            }
        }
    }
}

fn draw_quad(canvas: &mut Blend<RgbaImage>, quad: &Quad, color: Rgba<u8>) {
    for (a, b) in quad.edges() {
        draw_line_segment_mut(canvas, (a.x, a.y), (b.x, b.y), color);
    }
}

/// Dashed segment from `connector.start` to `connector.end`
fn draw_dashed_line(canvas: &mut Blend<RgbaImage>, connector: &Connector, color: Rgba<u8>) {
    let length = connector.length();
    if length < 1.0 {
        return;
    }
    let (ux, uy) = (
        (connector.end.x - connector.start.x) / length,
        (connector.end.y - connector.start.y) / length,
    );

    let mut t = 0.0;
    while t < length {
        let t_end = (t + DASH_LENGTH).min(length);
        let a = connector.start.offset(ux * t, uy * t);
        let b = connector.start.offset(ux * t_end, uy * t_end);
        draw_line_segment_mut(canvas, (a.x, a.y), (b.x, b.y), color);
        t += DASH_LENGTH + DASH_GAP;
    }
}
