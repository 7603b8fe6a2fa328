//! Natal chart data model and dignity configuration
//!
//! This crate holds everything the formula engine consumes but does not
//! compute itself:
//!
//! - the astrological vocabulary (planets, signs, angles, aspect kinds,
//!   dignities) with case-insensitive name lookup,
//! - the [`Chart`] value produced by an external ephemeris layer and read
//!   through the [`ChartSource`] trait,
//! - the [`DignityConfig`] rulership/exaltation tables with `traditional`
//!   and `modern` modes and canonical aspect orbs.
//!
//! All types here are immutable once constructed; a chart is never mutated
//! during evaluation.

pub mod chart;
pub mod dignity;
pub mod error;
pub mod types;

pub use chart::{circular_delta, AspectHit, Chart, ChartSource, PlanetState};
pub use dignity::{AspectSpec, DignityConfig, Mode, Placement};
pub use error::{ChartError, ConfigError};
pub use types::{Angle, AspectKind, Dignity, Planet, Sign};
