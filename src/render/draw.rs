//! Drawing a `RoadNetwork`: raster via tiny-skia, vector as a plain SVG document.

use super::network::{RoadNetwork, Viewport};
use super::RenderError;
use std::fmt::Write as _;
use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Dark theme: black figure, mid-gray streets, no axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapStyle {
    pub background: [u8; 3],
    pub edge: [u8; 3],
    /// Stroke width in points (1/72 inch).
    pub edge_width_pt: f64,
    /// Side of the square figure, inches.
    pub figure_inches: f64,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            background: [0x00, 0x00, 0x00],
            edge: [0x40, 0x40, 0x40],
            edge_width_pt: 0.5,
            figure_inches: 8.0,
        }
    }
}

impl MapStyle {
    /// Canvas side in pixels at `dpi`.
    pub fn canvas_px(&self, dpi: f64) -> u32 {
        (self.figure_inches * dpi).round().max(1.0) as u32
    }

    pub fn edge_width_px(&self, dpi: f64) -> f32 {
        (self.edge_width_pt * dpi / 72.0) as f32
    }
}

/// Rasterize the network onto a square canvas.
pub fn rasterize(network: &RoadNetwork, style: &MapStyle, dpi: f64) -> Result<Pixmap, RenderError> {
    let bounds = network.bounds().ok_or(RenderError::EmptyNetwork)?;
    let side = style.canvas_px(dpi);

    let mut pixmap = Pixmap::new(side, side)
        .ok_or_else(|| RenderError::Canvas(format!("cannot allocate {}x{} canvas", side, side)))?;
    let [r, g, b] = style.background;
    pixmap.fill(Color::from_rgba8(r, g, b, 255));

    let mut paint = Paint::default();
    let [r, g, b] = style.edge;
    paint.set_color_rgba8(r, g, b, 255);
    paint.anti_alias = true;

    let stroke = Stroke {
        width: style.edge_width_px(dpi),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    let viewport = Viewport::fit(bounds, side, side);
    for way in network.ways() {
        let mut pb = PathBuilder::new();
        for (i, p) in way.iter().enumerate() {
            let (x, y) = viewport.to_pixel(*p);
            if i == 0 {
                pb.move_to(x, y);
            } else {
                pb.line_to(x, y);
            }
        }
        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    Ok(pixmap)
}

/// Encode a rasterized network as PNG bytes.
pub fn render_png(network: &RoadNetwork, style: &MapStyle, dpi: f64) -> Result<Vec<u8>, RenderError> {
    rasterize(network, style, dpi)?
        .encode_png()
        .map_err(|e| RenderError::Encode(e.to_string()))
}

/// The same drawing as an SVG document.
pub fn render_svg(network: &RoadNetwork, style: &MapStyle, dpi: f64) -> Result<String, RenderError> {
    let bounds = network.bounds().ok_or(RenderError::EmptyNetwork)?;
    let side = style.canvas_px(dpi);
    let viewport = Viewport::fit(bounds, side, side);
    let [br, bg, bb] = style.background;
    let [er, eg, eb] = style.edge;

    let mut svg = String::new();
    // fmt::Write into a String cannot fail.
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{side}" height="{side}" viewBox="0 0 {side} {side}">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="rgb({br},{bg},{bb})"/>"#);
    let _ = writeln!(
        svg,
        r#"<g fill="none" stroke="rgb({er},{eg},{eb})" stroke-width="{:.3}" stroke-linecap="round" stroke-linejoin="round">"#,
        style.edge_width_px(dpi)
    );
    for way in network.ways() {
        svg.push_str(r#"<polyline points=""#);
        for (i, p) in way.iter().enumerate() {
            let (x, y) = viewport.to_pixel(*p);
            if i > 0 {
                svg.push(' ');
            }
            let _ = write!(svg, "{:.2},{:.2}", x, y);
        }
        svg.push_str("\"/>\n");
    }
    svg.push_str("</g>\n</svg>\n");
    Ok(svg)
}
