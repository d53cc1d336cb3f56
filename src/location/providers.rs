//! Geocoding providers: the `Geocoder` seam and its Nominatim implementation.

use super::types::{Coordinate, GeocodeError};
use serde::Deserialize;
use std::time::Duration;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const USER_AGENT: &str = "streetmap/0.4 (road-network-wallpaper)";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A forward-geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub coordinate: Coordinate,
    pub display_name: String,
}

/// Anything that can turn names into coordinates and back.
pub trait Geocoder {
    /// Forward geocoding. `Ok(None)` means the provider had no match.
    fn search(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError>;

    /// Reverse geocoding. `Ok(None)` means the point has no known name.
    fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError>;
}

// ─── Nominatim provider ─────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Deserialize, Debug, Clone)]
struct NominatimReverse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OpenStreetMap Nominatim over blocking HTTPS.
pub struct NominatimGeocoder {
    base_url: String,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self {
            base_url: NOMINATIM_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, GeocodeError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("GET {} {:?}", url, params);
        let mut request = ureq::get(&url)
            .set("User-Agent", USER_AGENT)
            .timeout(self.timeout);
        for (key, value) in params {
            request = request.query(key, value);
        }
        let response = request.call().map_err(map_ureq_error)?;

        response.into_json().map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                GeocodeError::Timeout(e.to_string())
            } else {
                GeocodeError::InvalidResponse(e.to_string())
            }
        })
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder for NominatimGeocoder {
    fn search(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError> {
        let results: Vec<NominatimResult> = self.get_json(
            "search",
            &[("q", query), ("format", "json"), ("limit", "1"), ("addressdetails", "0")],
        )?;

        let Some(top) = results.into_iter().next() else {
            return Ok(None);
        };

        let lat: f64 = top.lat.parse()
            .map_err(|_| GeocodeError::InvalidResponse(format!("bad lat '{}'", top.lat)))?;
        let lon: f64 = top.lon.parse()
            .map_err(|_| GeocodeError::InvalidResponse(format!("bad lon '{}'", top.lon)))?;
        let coordinate = Coordinate::new(lat, lon)
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        Ok(Some(GeocodeHit {
            coordinate,
            display_name: top.display_name,
        }))
    }

    fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError> {
        let lat = coordinate.lat().to_string();
        let lon = coordinate.lon().to_string();
        let result: NominatimReverse = self.get_json(
            "reverse",
            &[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "json"), ("zoom", "10")],
        )?;

        if let Some(err) = result.error {
            log::debug!("Nominatim reverse: {}", err);
            return Ok(None);
        }
        Ok(result.display_name.filter(|n| !n.trim().is_empty()))
    }
}

fn map_ureq_error(e: ureq::Error) -> GeocodeError {
    match e {
        ureq::Error::Status(code, _) => GeocodeError::Network(format!("HTTP {}", code)),
        ureq::Error::Transport(t) => {
            let msg = t.to_string();
            let lower = msg.to_lowercase();
            if lower.contains("timed out") || lower.contains("timeout") {
                GeocodeError::Timeout(msg)
            } else {
                GeocodeError::Network(msg)
            }
        }
    }
}

// ─── Name formatting ────────────────────────────────────────────

/// Shorten a provider display name to its first two components:
/// "Paris, Île-de-France, France métropolitaine, France" → "Paris, Île-de-France".
pub fn short_name(display_name: &str) -> String {
    display_name
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-readable coordinates: "37.9838°N, 23.7275°E".
pub fn format_coords(lat: f64, lon: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}°{}, {:.4}°{}", lat.abs(), ns, lon.abs(), ew)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::serve_once;

    #[test]
    fn test_short_name() {
        assert_eq!(
            short_name("Paris, Île-de-France, France métropolitaine, France"),
            "Paris, Île-de-France"
        );
        assert_eq!(short_name("Athens"), "Athens");
        assert_eq!(short_name(" , Norman, Oklahoma"), "Norman, Oklahoma");
    }

    #[test]
    fn test_format_coords() {
        assert_eq!(format_coords(37.9838, 23.7275), "37.9838°N, 23.7275°E");
        assert_eq!(format_coords(-33.8688, -70.6693), "33.8688°S, 70.6693°W");
    }

    #[test]
    fn test_search_encodes_query() {
        let body = r#"[{"lat": "69.6492", "lon": "18.9553", "display_name": "Tromsø, Troms, Norway"}]"#.as_bytes();
        let (url, server) = serve_once("application/json", body.to_vec());

        let hit = NominatimGeocoder::new()
            .with_base_url(url)
            .search("Tromsø a&b")
            .unwrap()
            .unwrap();
        assert_eq!(hit.display_name, "Tromsø, Troms, Norway");
        assert_eq!(hit.coordinate, Coordinate::new(69.6492, 18.9553).unwrap());

        let request = server.join().unwrap();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.starts_with("GET /search?"));
        assert!(request_line.contains("q=Troms%C3%B8+a%26b"));
        assert!(request_line.contains("limit=1"));
    }

    #[test]
    fn test_reverse_without_name() {
        let body = br#"{"error": "Unable to geocode"}"#;
        let (url, server) = serve_once("application/json", body.to_vec());

        let coordinate = Coordinate::new(0.0, -160.0).unwrap();
        let name = NominatimGeocoder::new().with_base_url(url).reverse(coordinate).unwrap();
        assert_eq!(name, None);

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /reverse?lat=0&lon=-160"));
    }

    #[test]
    fn test_builder_trims_base_url() {
        let g = NominatimGeocoder::new().with_base_url("http://localhost:8080/");
        assert_eq!(g.base_url, "http://localhost:8080");
    }
}
