//! streetmap: turn a place into a dark street-network wallpaper.
//!
//! Stages, in order: [`location`] resolves the query, [`render`] fetches and
//! draws the road network, [`postprocess`] crops and labels raster output,
//! [`janitor`] removes transient cache files. [`pipeline`] runs them.

pub mod config;
pub mod janitor;
pub mod location;
pub mod pipeline;
pub mod postprocess;
pub mod render;

#[cfg(test)]
mod test_server;
