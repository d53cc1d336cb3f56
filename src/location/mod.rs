//! Location subsystem: query parsing, geocoding with degrade-to-default
//! fallback, and a local geocode cache.

pub mod cache;
pub mod providers;
pub mod resolver;
pub mod types;

pub use cache::LocationCache;
pub use providers::{format_coords, GeocodeHit, Geocoder, NominatimGeocoder};
pub use resolver::{default_location, LocationResolver};
pub use types::{
    Coordinate, GeocodeError, LocationError, LocationSource, PlaceQuery, Resolution, ResolvedLocation,
};
