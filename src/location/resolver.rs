//! Location resolver: orchestrates the fallback chain.
//!
//! Sentinel flow:     "default" → Athens
//! Coordinate flow:   parse → reverse geocode → name, or NameUnresolved
//! Place flow:        cache → Nominatim → Athens (with a warning)
//!
//! Geocoding errors never escape: every failure degrades to the default.

use super::cache::LocationCache;
use super::providers::{self, Geocoder, NominatimGeocoder};
use super::types::{Coordinate, GeocodeError, LocationSource, PlaceQuery, Resolution, ResolvedLocation};

pub const DEFAULT_COORDINATE: Coordinate = Coordinate::new_unchecked(37.9838, 23.7275);
pub const DEFAULT_NAME: &str = "Athens, Greece";

/// The fixed default location.
pub fn default_location() -> ResolvedLocation {
    ResolvedLocation {
        coordinate: DEFAULT_COORDINATE,
        display_name: DEFAULT_NAME.to_string(),
        full_name: None,
        source: LocationSource::Default,
        fallback_reason: None,
    }
}

/// The location resolver with its fallback pipeline.
pub struct LocationResolver {
    geocoder: Box<dyn Geocoder>,
    cache: LocationCache,
    offline: bool,
}

impl LocationResolver {
    pub fn new() -> Self {
        Self {
            geocoder: Box::new(NominatimGeocoder::new()),
            cache: LocationCache::load(),
            offline: false,
        }
    }

    /// Create a resolver with a specific geocoder and cache (for testing).
    pub fn with_parts(geocoder: Box<dyn Geocoder>, cache: LocationCache) -> Self {
        Self { geocoder, cache, offline: false }
    }

    /// Set offline mode: skip network calls.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Resolve a free-form query.
    pub fn resolve(&mut self, query: &str) -> Resolution {
        match PlaceQuery::parse(query) {
            PlaceQuery::Default => Resolution::Resolved(default_location()),
            PlaceQuery::Coordinates(c) => self.resolve_coordinates(c),
            PlaceQuery::Place(name) => Resolution::Resolved(self.resolve_place(&name)),
        }
    }

    fn resolve_coordinates(&self, coordinate: Coordinate) -> Resolution {
        if self.offline {
            return Resolution::NameUnresolved(coordinate);
        }

        match self.geocoder.reverse(coordinate) {
            Ok(Some(full)) => Resolution::Resolved(ResolvedLocation {
                coordinate,
                display_name: providers::short_name(&full),
                full_name: Some(full),
                source: LocationSource::Nominatim,
                fallback_reason: None,
            }),
            Ok(None) => {
                log::info!("No place name found for {}", coordinate);
                Resolution::NameUnresolved(coordinate)
            }
            Err(e) => {
                log::warn!("Reverse geocoding failed for {}: {}", coordinate, e);
                Resolution::NameUnresolved(coordinate)
            }
        }
    }

    fn resolve_place(&mut self, name: &str) -> ResolvedLocation {
        // 1. Cache
        if let Some(loc) = self.cache.get(name) {
            log::debug!("Geocode cache hit for '{}'", name);
            return loc;
        }

        // 2. Nominatim (if online)
        if self.offline {
            return fallback(name, &GeocodeError::Offline);
        }

        match self.geocoder.search(name) {
            Ok(Some(hit)) => {
                let loc = ResolvedLocation {
                    coordinate: hit.coordinate,
                    display_name: providers::short_name(&hit.display_name),
                    full_name: Some(hit.display_name),
                    source: LocationSource::Nominatim,
                    fallback_reason: None,
                };
                self.cache.put(name, &loc);
                loc
            }
            // 3. Default
            Ok(None) => fallback(name, &format!("no results for '{}'", name)),
            Err(e) => fallback(name, &e),
        }
    }
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn fallback(query: &str, reason: &dyn std::fmt::Display) -> ResolvedLocation {
    let reason = reason.to_string();
    log::warn!("Could not geocode '{}' ({}); using {}", query, reason, DEFAULT_NAME);
    ResolvedLocation {
        source: LocationSource::Fallback,
        fallback_reason: Some(reason),
        ..default_location()
    }
}
