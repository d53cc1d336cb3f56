//! Overpass API client for drivable roads around a point.
//!
//! Raw responses are cached as `.cache/overpass-<hash>.json` under the
//! working directory; the janitor removes them at the end of a run.

use super::network::{project, RoadNetwork};
use super::{RenderError, OVERPASS_CACHE_PREFIX};
use crate::location::Coordinate;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
const USER_AGENT: &str = "streetmap/0.4 (road-network-wallpaper)";
const SERVER_TIMEOUT_S: u64 = 180;

/// Highway values excluded from the drivable network.
const EXCLUDED_HIGHWAYS: &str = "abandoned|bridleway|bus_guideway|construction|corridor|cycleway|\
elevator|escalator|footway|no|path|pedestrian|planned|platform|proposed|raceway|razed|service|steps|track";

#[derive(Deserialize, Debug)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
    },
    Way {
        #[serde(default)]
        nodes: Vec<i64>,
    },
    #[serde(other)]
    Other,
}

/// Blocking Overpass client with an on-disk response cache.
pub struct OverpassClient {
    url: String,
    cache_dir: PathBuf,
    timeout: Duration,
}

impl OverpassClient {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: OVERPASS_URL.to_string(),
            cache_dir: cache_dir.into(),
            timeout: Duration::from_secs(SERVER_TIMEOUT_S + 20),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Fetch the drivable network within `radius_m` metres of `center`.
    pub fn fetch_roads(&self, center: Coordinate, radius_m: f64) -> Result<RoadNetwork, RenderError> {
        let query = build_query(center, radius_m);
        let cache_path = self.cache_path(&query);

        let body = match fs::read_to_string(&cache_path) {
            Ok(cached) => {
                log::debug!("Overpass cache hit: {}", cache_path.display());
                cached
            }
            Err(_) => {
                let fresh = self.post(&query)?;
                self.store(&cache_path, &fresh);
                fresh
            }
        };

        parse_network(center, &body)
    }

    fn post(&self, query: &str) -> Result<String, RenderError> {
        log::info!("Downloading road network from {}", self.url);
        let response = ureq::post(&self.url)
            .set("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .send_form(&[("data", query)])
            .map_err(|e| RenderError::Network(e.to_string()))?;

        // `into_string` caps bodies at 10 MB; city-sized networks are larger.
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| RenderError::Network(e.to_string()))?;
        Ok(body)
    }

    fn cache_path(&self, query: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        query.hash(&mut hasher);
        self.cache_dir.join(format!("{}{:016x}.json", OVERPASS_CACHE_PREFIX, hasher.finish()))
    }

    fn store(&self, path: &Path, body: &str) {
        let result = fs::create_dir_all(&self.cache_dir).and_then(|_| fs::write(path, body));
        if let Err(e) = result {
            log::debug!("Could not cache Overpass response: {}", e);
        }
    }
}

pub(crate) fn build_query(center: Coordinate, radius_m: f64) -> String {
    format!(
        "[out:json][timeout:{}];\
         (way[\"highway\"][\"area\"!~\"yes\"][\"highway\"!~\"{}\"][\"motor_vehicle\"!~\"no\"][\"motorcar\"!~\"no\"]\
         (around:{:.0},{},{}););\
         (._;>;);out;",
        SERVER_TIMEOUT_S,
        EXCLUDED_HIGHWAYS,
        radius_m,
        center.lat(),
        center.lon(),
    )
}

/// Turn an Overpass JSON body into projected polylines. Ways referencing
/// nodes missing from the response are split at the gap.
pub(crate) fn parse_network(center: Coordinate, body: &str) -> Result<RoadNetwork, RenderError> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|e| RenderError::InvalidResponse(e.to_string()))?;

    let nodes: HashMap<i64, (f64, f64)> = response
        .elements
        .iter()
        .filter_map(|e| match e {
            Element::Node { id, lat, lon } => Some((*id, (*lat, *lon))),
            _ => None,
        })
        .collect();

    let mut network = RoadNetwork::new();
    for element in &response.elements {
        let Element::Way { nodes: refs } = element else { continue };
        let mut run = Vec::with_capacity(refs.len());
        for id in refs {
            match nodes.get(id) {
                Some(&(lat, lon)) => run.push(project(center, lat, lon)),
                None => network.push_way(std::mem::take(&mut run)),
            }
        }
        network.push_way(run);
    }

    log::info!("Road network: {} ways, {} edges", network.ways().len(), network.edge_count());
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::serve_once;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "version": 0.6,
        "elements": [
            {"type": "node", "id": 1, "lat": 37.9838, "lon": 23.7275},
            {"type": "node", "id": 2, "lat": 37.9848, "lon": 23.7275},
            {"type": "node", "id": 3, "lat": 37.9848, "lon": 23.7285},
            {"type": "node", "id": 4, "lat": 37.9828, "lon": 23.7265},
            {"type": "way", "id": 10, "nodes": [1, 2, 3], "tags": {"highway": "residential"}},
            {"type": "way", "id": 11, "nodes": [4, 99, 1, 2]},
            {"type": "relation", "id": 20, "members": []}
        ]
    }"#;

    fn athens() -> Coordinate {
        Coordinate::new(37.9838, 23.7275).unwrap()
    }

    #[test]
    fn test_parse_network() {
        let net = parse_network(athens(), SAMPLE).unwrap();
        // way 10 intact, way 11 split at missing node 99 → [4] dropped, [1, 2] kept
        assert_eq!(net.ways().len(), 2);
        assert_eq!(net.edge_count(), 3);
        assert_eq!(net.ways()[0][0].x, 0.0);
        assert_eq!(net.ways()[0][0].y, 0.0);
        assert!(net.ways()[0][1].y > 100.0);
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_network(athens(), "<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, RenderError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_no_elements() {
        let net = parse_network(athens(), r#"{"elements": []}"#).unwrap();
        assert!(net.is_empty());
    }

    #[test]
    fn test_build_query() {
        let q = build_query(athens(), 7000.0);
        assert!(q.starts_with("[out:json]"));
        assert!(q.contains("(around:7000,37.9838,23.7275)"));
        assert!(q.contains("footway"));
        assert!(q.ends_with("out;"));
    }

    #[test]
    fn test_cached_response_is_used() {
        let dir = TempDir::new().unwrap();
        // Unroutable URL: any network attempt would fail the test.
        let client = OverpassClient::new(dir.path().join(".cache")).with_url("http://127.0.0.1:9/");
        let query = build_query(athens(), 500.0);
        let path = client.cache_path(&query);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, SAMPLE).unwrap();

        let net = client.fetch_roads(athens(), 500.0).unwrap();
        assert_eq!(net.ways().len(), 2);
    }

    #[test]
    fn test_large_response_is_downloaded_and_cached() {
        let dir = TempDir::new().unwrap();
        // Valid JSON padded past 12 MB with trailing whitespace.
        let mut body = SAMPLE.as_bytes().to_vec();
        body.resize(12 * 1024 * 1024, b' ');
        let (url, server) = serve_once("application/json", body);

        let client = OverpassClient::new(dir.path().join(".cache")).with_url(url);
        let net = client.fetch_roads(athens(), 18000.0).unwrap();
        assert_eq!(net.ways().len(), 2);

        let request = server.join().unwrap();
        assert!(request.starts_with("POST "));
        let cached = client.cache_path(&build_query(athens(), 18000.0));
        assert!(fs::metadata(cached).unwrap().len() > 10 * 1024 * 1024);
    }

    #[test]
    fn test_cache_path_is_stable_per_query() {
        let client = OverpassClient::new("/tmp/x/.cache");
        let a = client.cache_path("q1");
        assert_eq!(a, client.cache_path("q1"));
        assert_ne!(a, client.cache_path("q2"));
        assert!(a.to_string_lossy().contains("overpass-"));
    }
}
