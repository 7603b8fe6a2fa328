#![allow(dead_code)]

use astrea_chart::{
    AspectHit, AspectKind, Chart, ChartSource, Dignity, DignityConfig, Mode, Planet, PlanetState,
    Sign,
};
use astrea_formula::{Engine, EngineOptions};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Direct planet at a longitude, with sign and degree derived.
pub fn state(longitude: f64, house: u8) -> PlanetState {
    PlanetState {
        longitude,
        sign: Sign::from_longitude(longitude),
        house,
        degree_in_sign: longitude % 30.0,
        retrograde: false,
        speed: 1.0,
        dignity: Dignity::Neutral,
    }
}

/// Build a chart from `(planet, longitude, house)` triples, all direct.
pub fn chart(mode: Mode, placements: &[(Planet, f64, u8)]) -> Chart {
    let planets: BTreeMap<Planet, PlanetState> = placements
        .iter()
        .map(|(planet, longitude, house)| (*planet, state(*longitude, *house)))
        .collect();
    Chart {
        mode,
        planets,
        houses: [0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 180.0, 210.0, 240.0, 270.0, 300.0, 330.0],
        aspects: Vec::new(),
    }
}

/// Sun at 15° Capricorn in the 8th, Moon at 10° Gemini in the 7th, and the
/// remaining classical planets spread around the wheel.
pub fn reference_chart(mode: Mode) -> Chart {
    chart(
        mode,
        &[
            (Planet::Sun, 285.0, 8),
            (Planet::Moon, 70.0, 7),
            (Planet::Mercury, 290.0, 8),
            (Planet::Venus, 310.0, 9),
            (Planet::Mars, 10.0, 1),
            (Planet::Jupiter, 95.0, 4),
            (Planet::Saturn, 12.0, 1),
            (Planet::Uranus, 210.0, 6),
            (Planet::Neptune, 330.0, 10),
            (Planet::Pluto, 265.0, 8),
        ],
    )
}

pub fn aspect(p1: Planet, p2: Planet, kind: AspectKind, orb: f64) -> AspectHit {
    AspectHit {
        p1,
        p2,
        kind,
        orb,
        applying: true,
    }
}

pub fn engine(mode: Mode) -> Engine {
    Engine::new(Arc::new(DignityConfig::for_mode(mode)))
}

pub fn engine_with_options(mode: Mode, options: EngineOptions) -> Engine {
    Engine::with_options(Arc::new(DignityConfig::for_mode(mode)), options)
}

/// Chart wrapper recording every planet-state probe, used to observe
/// short-circuit behavior.
pub struct ProbeChart {
    inner: Chart,
    pub probes: RefCell<Vec<Planet>>,
}

impl ProbeChart {
    pub fn new(inner: Chart) -> Self {
        Self {
            inner,
            probes: RefCell::new(Vec::new()),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.borrow().len()
    }

    pub fn probed(&self, planet: Planet) -> bool {
        self.probes.borrow().contains(&planet)
    }
}

impl ChartSource for ProbeChart {
    fn mode(&self) -> Mode {
        self.inner.mode()
    }

    fn planet_state(&self, planet: Planet) -> Option<&PlanetState> {
        self.probes.borrow_mut().push(planet);
        self.inner.planet_state(planet)
    }

    fn houses(&self) -> &[f64; 12] {
        self.inner.houses()
    }

    fn aspects(&self) -> &[astrea_chart::AspectHit] {
        self.inner.aspects()
    }
}
