//! # geofill Common Library
//!
//! Shared code for the geofill workspace:
//! - Error and result types
//! - Bootstrap configuration loading (TOML + environment)
//! - Geodesic coordinate type and distance helpers
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod geo;
pub mod logging;

pub use error::{Error, Result};
pub use geo::Coordinate;
