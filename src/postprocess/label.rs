//! Location label: right-aligned text in the top-right corner with a drop shadow.
//!
//! Text is typeset by resvg into a transparent layer, then alpha-composited
//! onto the map.

use super::PostProcessError;
use image::{Rgba, RgbaImage};
use resvg::usvg::{self, fontdb};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::{Pixmap, Transform};

const FALLBACK_FAMILY: &str = "sans-serif";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    pub font_size: f32,
    /// Distance from the top and right edges.
    pub padding: u32,
    /// Shadow displacement, right and down.
    pub shadow_offset: u32,
    pub fill: [u8; 4],
    pub shadow: [u8; 4],
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 48.0,
            padding: 40,
            shadow_offset: 3,
            fill: [200, 200, 200, 179],
            shadow: [0, 0, 0, 153],
        }
    }
}

/// Which font the label ended up with.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelFont {
    Custom { family: String, path: PathBuf },
    /// The configured file was missing or unreadable; system sans-serif is used.
    Fallback,
}

pub struct LabelRenderer {
    options: usvg::Options<'static>,
    font: LabelFont,
    style: LabelStyle,
}

impl LabelRenderer {
    /// Load the label font from `font_path`, falling back to the system
    /// sans-serif face with a warning. Never fails.
    pub fn load(font_path: &Path, style: LabelStyle) -> Self {
        let mut db = fontdb::Database::new();
        let custom = match db.load_font_file(font_path) {
            Ok(()) => db
                .faces()
                .flat_map(|face| face.families.iter())
                .map(|(family, _)| family.clone())
                .next(),
            Err(_) => None,
        };

        let font = match custom {
            Some(family) => LabelFont::Custom { family, path: font_path.to_path_buf() },
            None => {
                log::warn!("Font {} not found or unreadable; using system default", font_path.display());
                db.load_system_fonts();
                LabelFont::Fallback
            }
        };

        let mut options = usvg::Options::default();
        options.fontdb = Arc::new(db);
        Self { options, font, style }
    }

    pub fn font(&self) -> &LabelFont {
        &self.font
    }

    fn family(&self) -> &str {
        match &self.font {
            LabelFont::Custom { family, .. } => family,
            LabelFont::Fallback => FALLBACK_FAMILY,
        }
    }

    /// SVG overlay of the given size carrying the shadow then the label.
    pub(crate) fn overlay_svg(&self, width: u32, height: u32, text: &str) -> String {
        let s = &self.style;
        let x = width.saturating_sub(s.padding) as f32;
        let y = s.padding as f32 + s.font_size;
        let off = s.shadow_offset as f32;
        let text = xml_escape(text);
        let family = xml_escape(self.family());

        let text_el = |x: f32, y: f32, [r, g, b, a]: [u8; 4]| {
            format!(
                r#"<text x="{x}" y="{y}" font-family="{family}" font-size="{}" text-anchor="end" fill="rgb({r},{g},{b})" fill-opacity="{:.3}">{text}</text>"#,
                s.font_size,
                a as f32 / 255.0,
            )
        };

        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">{}{}</svg>"#,
            text_el(x + off, y + off, s.shadow),
            text_el(x, y, s.fill),
        )
    }

    /// Burn `text` into `canvas`.
    pub fn draw(&self, canvas: &mut RgbaImage, text: &str) -> Result<(), PostProcessError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let (width, height) = canvas.dimensions();
        let svg = self.overlay_svg(width, height, text);

        let tree = usvg::Tree::from_str(&svg, &self.options)
            .map_err(|e| PostProcessError::Label(e.to_string()))?;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| PostProcessError::Label("failed to allocate label layer".into()))?;
        resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

        let pixels = pixmap.pixels();
        let layer = RgbaImage::from_fn(width, height, |x, y| {
            let c = pixels[(y * width + x) as usize].demultiply();
            Rgba([c.red(), c.green(), c.blue(), c.alpha()])
        });
        image::imageops::overlay(canvas, &layer, 0, 0);
        Ok(())
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
