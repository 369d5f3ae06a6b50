use ab_glyph::{Font, FontRef, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tiny_skia::{Pixmap, PremultipliedColorU8};

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Rendered strings are kept until the cache grows past this many entries.
const CACHE_LIMIT: usize = 256;

pub(crate) fn load_font() -> Result<FontRef<'static>> {
    FontRef::try_from_slice(FONT_DATA).context("bundled font is invalid")
}

/// Rasterizes `text` on one line into a tightly cropped, transparent pixmap.
/// `None` when nothing in `text` has an outline.
pub fn render_text_pixmap(
    text: &str,
    font_size: f32,
    font: &FontRef<'static>,
    rgb: [u8; 3],
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::with_capacity(text.len());
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    if outlines.is_empty() {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // premultiplied source over whatever an overlapping glyph left
            let a = cov.clamp(0.0, 1.0);
            let sa = (a * 255.0) as u8;
            let inv = 1.0 - a;
            let bg = dst[i];
            let blend = |src: u8, under: u8| {
                ((src as f32 * a) as u8).saturating_add((under as f32 * inv) as u8)
            };
            if let Some(px) = PremultipliedColorU8::from_rgba(
                blend(rgb[0], bg.red()),
                blend(rgb[1], bg.green()),
                blend(rgb[2], bg.blue()),
                sa.saturating_add((bg.alpha() as f32 * inv) as u8),
            ) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

/// Rendered labels of one size and color, keyed by their text.
pub(crate) struct TextCache {
    font: FontRef<'static>,
    size_px: f32,
    rgb: [u8; 3],
    map: HashMap<String, Arc<Pixmap>>,
}

impl TextCache {
    pub(crate) fn new(font: FontRef<'static>, size_px: f32, rgb: [u8; 3]) -> Self {
        Self {
            font,
            size_px,
            rgb,
            map: HashMap::new(),
        }
    }

    pub(crate) fn get_or_render(&mut self, text: &str) -> Option<Arc<Pixmap>> {
        if let Some(p) = self.map.get(text) {
            return Some(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(text, self.size_px, &self.font, self.rgb)?);
        if self.map.len() >= CACHE_LIMIT {
            self.map.clear();
        }
        self.map.insert(text.to_string(), Arc::clone(&pm));
        Some(pm)
    }
}
