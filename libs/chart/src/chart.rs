//! The computed chart value consumed by the formula evaluator
//!
//! A [`Chart`] is produced by an external ephemeris layer and crosses into
//! this crate as a JSON document. The evaluator never touches [`Chart`]
//! directly; it reads through the [`ChartSource`] trait so that callers can
//! interpose instrumentation (the test suites count property probes through
//! a wrapping source to observe short-circuit behavior).

use crate::dignity::Mode;
use crate::error::ChartError;
use crate::types::{Angle, AspectKind, Dignity, Planet, Sign};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distance between two ecliptic longitudes measured on the circle:
/// `min(|a-b|, 360-|a-b|)`. Aspect orb tests use this metric.
pub fn circular_delta(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    d.min(360.0 - d)
}

/// Position and motion of one planet at the chart moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetState {
    /// Ecliptic longitude in `[0, 360)`.
    pub longitude: f64,
    pub sign: Sign,
    /// House occupied, `1..=12`.
    pub house: u8,
    /// Degrees into the sign, `[0, 30)`.
    pub degree_in_sign: f64,
    /// Always `false` for Sun and Moon.
    pub retrograde: bool,
    /// Daily motion in degrees; negative while retrograde.
    pub speed: f64,
    pub dignity: Dignity,
}

/// One aspect found by the chart producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectHit {
    pub p1: Planet,
    pub p2: Planet,
    pub kind: AspectKind,
    /// Deviation from the exact angle, in degrees.
    pub orb: f64,
    pub applying: bool,
}

impl AspectHit {
    /// Whether this entry concerns the unordered pair `(a, b)`.
    pub fn involves(&self, a: Planet, b: Planet) -> bool {
        (self.p1 == a && self.p2 == b) || (self.p1 == b && self.p2 == a)
    }
}

/// A computed natal chart. Immutable for the duration of any evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub mode: Mode,
    pub planets: BTreeMap<Planet, PlanetState>,
    /// Cusp longitudes of the twelve houses.
    pub houses: [f64; 12],
    #[serde(default)]
    pub aspects: Vec<AspectHit>,
}

impl Chart {
    /// Deserialize a chart from its JSON boundary form.
    pub fn from_json_str(json: &str) -> Result<Chart, ChartError> {
        serde_json::from_str(json).map_err(|e| ChartError::InvalidChart(e.to_string()))
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Chart, ChartError> {
        serde_json::from_value(value).map_err(|e| ChartError::InvalidChart(e.to_string()))
    }

    /// Re-establish the chart invariants: luminaries are forced direct and
    /// every `sign` is re-derived from its `longitude`. The producer is
    /// trusted, so deserialization does not call this implicitly.
    pub fn normalize(&mut self) {
        for (planet, state) in self.planets.iter_mut() {
            if planet.is_luminary() {
                state.retrograde = false;
            }
            state.longitude = state.longitude.rem_euclid(360.0);
            state.sign = Sign::from_longitude(state.longitude);
            state.degree_in_sign = state.longitude % 30.0;
        }
    }

    /// Check the value ranges of the boundary schema without repairing them.
    pub fn validate(&self) -> Result<(), ChartError> {
        for (planet, state) in &self.planets {
            if !(0.0..360.0).contains(&state.longitude) {
                return Err(ChartError::InvalidChart(format!(
                    "{planet}: longitude {} outside [0, 360)",
                    state.longitude
                )));
            }
            if !(1..=12).contains(&state.house) {
                return Err(ChartError::InvalidChart(format!(
                    "{planet}: house {} outside 1..=12",
                    state.house
                )));
            }
            if planet.is_luminary() && state.retrograde {
                return Err(ChartError::InvalidChart(format!(
                    "{planet} cannot be retrograde"
                )));
            }
        }
        Ok(())
    }
}

/// Read-only access to a chart, as seen by the evaluator.
///
/// The methods mirror exactly what formulas can observe. Implementations
/// other than [`Chart`] exist to instrument access (probe counting in
/// tests) without copying chart data.
pub trait ChartSource {
    fn mode(&self) -> Mode;

    /// State of one planet, `None` when the chart does not carry it.
    fn planet_state(&self, planet: Planet) -> Option<&PlanetState>;

    /// Cusp longitudes of the twelve houses.
    fn houses(&self) -> &[f64; 12];

    /// All aspects found by the producer.
    fn aspects(&self) -> &[AspectHit];

    /// Longitude of a chart angle, read off the cusp array.
    fn angle_longitude(&self, angle: Angle) -> f64 {
        self.houses()[angle.cusp_index()]
    }
}

impl ChartSource for Chart {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn planet_state(&self, planet: Planet) -> Option<&PlanetState> {
        self.planets.get(&planet)
    }

    fn houses(&self) -> &[f64; 12] {
        &self.houses
    }

    fn aspects(&self) -> &[AspectHit] {
        &self.aspects
    }
}
