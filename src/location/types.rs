//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 point. Only constructible inside the valid lat/lon ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

/// Unvalidated wire form; deserialization goes through [`Coordinate::new`].
#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = LocationError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lon)
    }
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self, LocationError> {
        if !lat.is_finite() || !lon.is_finite()
            || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lon)
        {
            return Err(LocationError::OutOfRange { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    /// Only for compile-time constants already known to be in range.
    pub(crate) const fn new_unchecked(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Parse a literal `"lat, lon"` pair. Whitespace around either number is ignored.
    /// Returns `None` for anything that is not exactly two in-range floats.
    pub fn parse(s: &str) -> Option<Self> {
        let (lat, lon) = s.split_once(',')?;
        let lat: f64 = lat.trim().parse().ok()?;
        let lon: f64 = lon.trim().parse().ok()?;
        Self::new(lat, lon).ok()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

/// What the user typed, classified before any network call is made.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceQuery {
    /// The `default` sentinel (or an empty string).
    Default,
    Coordinates(Coordinate),
    Place(String),
}

impl PlaceQuery {
    pub const SENTINEL: &'static str = "default";

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::SENTINEL) {
            return Self::Default;
        }
        match Coordinate::parse(trimmed) {
            Some(c) => Self::Coordinates(c),
            None => Self::Place(trimmed.to_string()),
        }
    }
}

/// How a location was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationSource {
    /// The `default` sentinel was given.
    Default,
    Cache,
    Nominatim,
    /// Geocoding failed; the default location was substituted.
    Fallback,
    /// Literal coordinates whose name came from the caller.
    Manual,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Cache => write!(f, "Cache"),
            Self::Nominatim => write!(f, "Nominatim"),
            Self::Fallback => write!(f, "Fallback"),
            Self::Manual => write!(f, "Manual"),
        }
    }
}

/// A fully resolved location. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    /// Short name used for the map label (e.g. "Paris, Île-de-France").
    pub display_name: String,
    /// Full name from the provider, when one was involved.
    #[serde(default)]
    pub full_name: Option<String>,
    pub source: LocationSource,
    /// Why the default was substituted (only set for `Fallback`).
    #[serde(default)]
    pub fallback_reason: Option<String>,
}

impl ResolvedLocation {
    pub fn is_fallback(&self) -> bool {
        self.source == LocationSource::Fallback
    }

    pub fn display_line(&self) -> String {
        let coords = super::providers::format_coords(self.coordinate.lat(), self.coordinate.lon());
        format!("{} ({}) [{}]", self.display_name, coords, self.source)
    }
}

/// Outcome of resolving a query.
///
/// Literal coordinates that reverse geocoding cannot name come back as
/// `NameUnresolved`; the caller decides whether to ask the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedLocation),
    NameUnresolved(Coordinate),
}

impl Resolution {
    /// Finish an unresolved result with a caller-supplied name.
    /// A `None` name falls back to the coordinate text itself.
    pub fn name_with<F>(self, namer: F) -> ResolvedLocation
    where
        F: FnOnce(Coordinate) -> Option<String>,
    {
        match self {
            Self::Resolved(loc) => loc,
            Self::NameUnresolved(coordinate) => {
                let display_name = namer(coordinate)
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| coordinate.to_string());
                ResolvedLocation {
                    coordinate,
                    display_name,
                    full_name: None,
                    source: LocationSource::Manual,
                    fallback_reason: None,
                }
            }
        }
    }
}

/// Location errors.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationError {
    OutOfRange { lat: f64, lon: f64 },
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { lat, lon } => write!(
                f,
                "Invalid coordinates ({}, {}). Lat: -90..90, Lon: -180..180",
                lat, lon
            ),
        }
    }
}

impl std::error::Error for LocationError {}

/// Geocoding provider errors. Never escape the resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeError {
    Timeout(String),
    Network(String),
    InvalidResponse(String),
    Offline,
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(msg) => write!(f, "Geocoding timed out: {}", msg),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid API response: {}", msg),
            Self::Offline => write!(f, "Offline mode: geocoding disabled"),
        }
    }
}

impl std::error::Error for GeocodeError {}
