//! File-based geocode cache at `<cache_dir>/streetmap/geocode.json`.
//!
//! TTL: 30 days. Case-insensitive keys. Only forward-geocode hits are stored;
//! fallbacks never are.

use super::types::{Coordinate, LocationSource, ResolvedLocation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const CACHE_TTL_MS: i64 = 30 * 24 * 3600 * 1000; // 30 days in ms

#[derive(Serialize, Deserialize, Clone)]
struct CacheEntry {
    lat: f64,
    lon: f64,
    name: String,
    timestamp: i64,
    #[serde(default)]
    full_name: Option<String>,
}

/// The geocode cache.
pub struct LocationCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl LocationCache {
    /// Load cache from the default location.
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load cache from a specific path (for testing).
    pub fn load_from(path: PathBuf) -> Self {
        let entries = Self::read_file(&path).unwrap_or_default();
        Self { path, entries }
    }

    fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("streetmap")
            .join("geocode.json")
    }

    fn read_file(path: &Path) -> Option<HashMap<String, CacheEntry>> {
        let data = fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    /// Look up a query. Returns None if missing, expired, or the stored
    /// coordinate is no longer valid.
    pub fn get(&self, query: &str) -> Option<ResolvedLocation> {
        let entry = self.entries.get(&cache_key(query))?;

        let now = chrono::Utc::now().timestamp_millis();
        if now - entry.timestamp > CACHE_TTL_MS {
            return None; // expired
        }

        Some(ResolvedLocation {
            coordinate: Coordinate::new(entry.lat, entry.lon).ok()?,
            display_name: entry.name.clone(),
            full_name: entry.full_name.clone(),
            source: LocationSource::Cache,
            fallback_reason: None,
        })
    }

    /// Store a resolved location under `query` and persist to disk.
    pub fn put(&mut self, query: &str, resolved: &ResolvedLocation) {
        if resolved.is_fallback() {
            return;
        }
        let entry = CacheEntry {
            lat: resolved.coordinate.lat(),
            lon: resolved.coordinate.lon(),
            name: resolved.display_name.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            full_name: resolved.full_name.clone(),
        };
        self.entries.insert(cache_key(query), entry);
        self.persist();
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(&self.entries) {
            if let Err(e) = fs::write(&self.path, json) {
                log::debug!("Could not write geocode cache {}: {}", self.path.display(), e);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cache_key(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cache() -> (LocationCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocode.json");
        (LocationCache::load_from(path), dir)
    }

    fn paris() -> ResolvedLocation {
        ResolvedLocation {
            coordinate: Coordinate::new(48.8566, 2.3522).unwrap(),
            display_name: "Paris, Île-de-France".into(),
            full_name: Some("Paris, Île-de-France, France métropolitaine, France".into()),
            source: LocationSource::Nominatim,
            fallback_reason: None,
        }
    }

    #[test]
    fn test_cache_put_get() {
        let (mut cache, _dir) = test_cache();
        cache.put("Paris", &paris());

        let result = cache.get("paris").unwrap();
        assert_eq!(result.display_name, "Paris, Île-de-France");
        assert_eq!(result.source, LocationSource::Cache);
        assert!((result.coordinate.lat() - 48.8566).abs() < 0.001);
        assert!(result.full_name.is_some());
    }

    #[test]
    fn test_cache_case_and_space_insensitive() {
        let (mut cache, _dir) = test_cache();
        cache.put("New York", &paris());

        assert!(cache.get("NEW YORK").is_some());
        assert!(cache.get("  new   york ").is_some());
    }

    #[test]
    fn test_cache_miss() {
        let (cache, _dir) = test_cache();
        assert!(cache.get("nonexistent").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_skips_fallbacks() {
        let (mut cache, _dir) = test_cache();
        let mut loc = paris();
        loc.source = LocationSource::Fallback;
        cache.put("Nowhereland", &loc);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cache_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("geocode.json");

        {
            let mut cache = LocationCache::load_from(path.clone());
            cache.put("paris", &paris());
        }

        let cache2 = LocationCache::load_from(path);
        assert_eq!(cache2.get("paris").unwrap().display_name, "Paris, Île-de-France");
    }

    #[test]
    fn test_cache_expired_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocode.json");
        let json = r#"{
            "athens": {
                "lat": 37.9838,
                "lon": 23.7275,
                "name": "Athens",
                "timestamp": 0
            }
        }"#;
        fs::write(&path, json).unwrap();

        let cache = LocationCache::load_from(path);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("athens").is_none());
    }

    #[test]
    fn test_cache_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geocode.json");
        fs::write(&path, "{ not json").unwrap();

        let cache = LocationCache::load_from(path);
        assert!(cache.is_empty());
    }
}
