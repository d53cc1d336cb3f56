//! Map rendering: fetch the road network around a location and draw it.

pub mod draw;
pub mod network;
pub mod overpass;

use crate::config::{OutputFormat, RenderSpec};
use crate::location::ResolvedLocation;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub use draw::MapStyle;
pub use network::RoadNetwork;
pub use overpass::OverpassClient;

/// Name of the transient cache directory inside the working directory.
pub const CACHE_DIR_NAME: &str = ".cache";

/// File name prefix of cached Overpass responses inside [`CACHE_DIR_NAME`].
pub const OVERPASS_CACHE_PREFIX: &str = "overpass-";

/// Produces the raw map file for a location.
pub trait MapRenderer {
    fn render(&self, location: &ResolvedLocation, spec: &RenderSpec, output: &Path) -> Result<(), RenderError>;
}

/// Overpass roads drawn in the dark theme.
pub struct OverpassRenderer {
    client: OverpassClient,
    style: MapStyle,
}

impl OverpassRenderer {
    /// Renderer caching its downloads under `<work_dir>/.cache`.
    pub fn new(work_dir: &Path) -> Self {
        Self {
            client: OverpassClient::new(cache_dir_in(work_dir)),
            style: MapStyle::default(),
        }
    }
}

impl MapRenderer for OverpassRenderer {
    fn render(&self, location: &ResolvedLocation, spec: &RenderSpec, output: &Path) -> Result<(), RenderError> {
        let network = self.client.fetch_roads(location.coordinate, spec.radius_m)?;
        write_network(&network, &self.style, spec, output)
    }
}

/// Draw `network` in `spec.format` and write it to `output`.
pub fn write_network(
    network: &RoadNetwork,
    style: &MapStyle,
    spec: &RenderSpec,
    output: &Path,
) -> Result<(), RenderError> {
    match spec.format {
        OutputFormat::Png => fs::write(output, draw::render_png(network, style, spec.dpi)?)?,
        OutputFormat::Svg => fs::write(output, draw::render_svg(network, style, spec.dpi)?)?,
    }
    log::info!("Map written to {}", output.display());
    Ok(())
}

pub fn cache_dir_in(work_dir: &Path) -> PathBuf {
    work_dir.join(CACHE_DIR_NAME)
}

/// Rendering errors.
#[derive(Debug)]
pub enum RenderError {
    Network(String),
    InvalidResponse(String),
    /// No drawable roads in the requested radius.
    EmptyNetwork,
    Canvas(String),
    Encode(String),
    Io(std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid Overpass response: {}", msg),
            Self::EmptyNetwork => write!(f, "No roads found in the requested radius"),
            Self::Canvas(msg) => write!(f, "Canvas error: {}", msg),
            Self::Encode(msg) => write!(f, "Encoding error: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::network::Point;
    use tempfile::TempDir;

    fn line() -> RoadNetwork {
        let mut net = RoadNetwork::new();
        net.push_way(vec![Point { x: 0.0, y: 0.0 }, Point { x: 50.0, y: 25.0 }]);
        net
    }

    #[test]
    fn test_write_network_png() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("map.png");
        let spec = RenderSpec::new(1000.0, 40.0, 1.0, OutputFormat::Png).unwrap();
        write_network(&line(), &MapStyle::default(), &spec, &out).unwrap();

        let img = image::open(&out).unwrap();
        assert_eq!((img.width(), img.height()), (320, 320));
    }

    #[test]
    fn test_write_network_svg() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("map.svg");
        let spec = RenderSpec::new(1000.0, 40.0, 1.0, OutputFormat::Svg).unwrap();
        write_network(&line(), &MapStyle::default(), &spec, &out).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("<svg"));
    }

    #[test]
    fn test_cache_dir_in() {
        assert_eq!(cache_dir_in(Path::new("/work")), PathBuf::from("/work/.cache"));
    }
}
