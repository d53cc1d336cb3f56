//! Road network geometry in local metres around a centre point.

use crate::location::Coordinate;

/// Mean Earth radius (IUGG), metres.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A projected point: metres east (`x`) and north (`y`) of the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Equirectangular projection around `center`. Accurate enough for the
/// tens-of-kilometres extents drawn here.
pub fn project(center: Coordinate, lat: f64, lon: f64) -> Point {
    let cos_lat = center.lat().to_radians().cos();
    Point {
        x: (lon - center.lon()).to_radians() * EARTH_RADIUS_M * cos_lat,
        y: (lat - center.lat()).to_radians() * EARTH_RADIUS_M,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// The drawable street graph: one polyline per road.
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    ways: Vec<Vec<Point>>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a polyline. Single-point ways carry no edges and are dropped.
    pub fn push_way(&mut self, points: Vec<Point>) {
        if points.len() >= 2 {
            self.ways.push(points);
        }
    }

    pub fn ways(&self) -> &[Vec<Point>] {
        &self.ways
    }

    pub fn is_empty(&self) -> bool {
        self.ways.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.ways.iter().map(|w| w.len() - 1).sum()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = self.ways.iter().flatten();
        let first = points.next()?;
        let init = Bounds { min_x: first.x, min_y: first.y, max_x: first.x, max_y: first.y };
        Some(points.fold(init, |b, p| Bounds {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }
}

/// Maps network metres onto a pixel canvas with equal axis scaling,
/// zero padding, centred, north up.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    bounds: Bounds,
}

impl Viewport {
    pub fn fit(bounds: Bounds, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        let sx = if bounds.width() > 0.0 { w / bounds.width() } else { f64::INFINITY };
        let sy = if bounds.height() > 0.0 { h / bounds.height() } else { f64::INFINITY };
        let mut scale = sx.min(sy);
        if !scale.is_finite() {
            scale = 1.0; // degenerate extent: a single point
        }
        Self {
            scale,
            offset_x: (w - bounds.width() * scale) / 2.0,
            offset_y: (h - bounds.height() * scale) / 2.0,
            bounds,
        }
    }

    pub fn to_pixel(&self, p: Point) -> (f32, f32) {
        let x = self.offset_x + (p.x - self.bounds.min_x) * self.scale;
        let y = self.offset_y + (self.bounds.max_y - p.y) * self.scale;
        (x as f32, y as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn athens() -> Coordinate {
        Coordinate::new(37.9838, 23.7275).unwrap()
    }

    #[test]
    fn test_project_center_is_origin() {
        let p = project(athens(), 37.9838, 23.7275);
        assert_abs_diff_eq!(p.x, 0.0);
        assert_abs_diff_eq!(p.y, 0.0);
    }

    #[test]
    fn test_project_one_degree_north() {
        let p = project(athens(), 38.9838, 23.7275);
        // ~111.2 km per degree of latitude
        assert_abs_diff_eq!(p.y, 111_195.0, epsilon = 50.0);
        assert_abs_diff_eq!(p.x, 0.0);
    }

    #[test]
    fn test_project_longitude_shrinks_with_latitude() {
        let p = project(athens(), 37.9838, 24.7275);
        assert!(p.x > 87_000.0 && p.x < 88_000.0);
    }

    #[test]
    fn test_short_ways_dropped() {
        let mut net = RoadNetwork::new();
        net.push_way(vec![Point { x: 0.0, y: 0.0 }]);
        assert!(net.is_empty());
        net.push_way(vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }]);
        assert_eq!(net.ways().len(), 1);
        assert_eq!(net.edge_count(), 2);
    }

    #[test]
    fn test_bounds() {
        let mut net = RoadNetwork::new();
        assert!(net.bounds().is_none());
        net.push_way(vec![Point { x: -5.0, y: 2.0 }, Point { x: 3.0, y: -1.0 }]);
        net.push_way(vec![Point { x: 0.0, y: 7.0 }, Point { x: 1.0, y: 0.0 }]);
        let b = net.bounds().unwrap();
        assert_eq!(b, Bounds { min_x: -5.0, min_y: -1.0, max_x: 3.0, max_y: 7.0 });
    }

    #[test]
    fn test_viewport_fits_and_centres() {
        // 200 x 100 m extent into a 100 x 100 canvas: scale 0.5, vertical centring
        let b = Bounds { min_x: 0.0, min_y: 0.0, max_x: 200.0, max_y: 100.0 };
        let vp = Viewport::fit(b, 100, 100);
        assert_eq!(vp.to_pixel(Point { x: 0.0, y: 100.0 }), (0.0, 25.0));
        assert_eq!(vp.to_pixel(Point { x: 200.0, y: 0.0 }), (100.0, 75.0));
    }

    #[test]
    fn test_viewport_degenerate_extent() {
        let b = Bounds { min_x: 5.0, min_y: 5.0, max_x: 5.0, max_y: 5.0 };
        let vp = Viewport::fit(b, 10, 10);
        assert_eq!(vp.to_pixel(Point { x: 5.0, y: 5.0 }), (5.0, 5.0));
    }
}
