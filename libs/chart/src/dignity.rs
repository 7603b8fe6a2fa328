//! Rulership and dignity configuration
//!
//! The configuration is loaded once from an external JSON document and
//! shared immutably (typically behind an `Arc`) between the validator and
//! the evaluator. Two built-in modes exist: `traditional` carries the seven
//! classical rulerships, `modern` adds Pluto, Uranus and Neptune as
//! co-rulers of Scorpio, Aquarius and Pisces. A document may override any
//! table; whatever it leaves out falls back to the mode's built-ins.

use crate::error::{ChartError, ConfigError};
use crate::types::{AspectKind, Dignity, Planet, Sign};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Ruler set in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Traditional,
    Modern,
}

impl FromStr for Mode {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "traditional" => Ok(Mode::Traditional),
            "modern" => Ok(Mode::Modern),
            other => Err(ChartError::InvalidChart(format!("unknown mode: {other}"))),
        }
    }
}

/// A dignity placement: a sign, optionally pinned to an exact degree.
///
/// Exaltation degrees are carried through from the configuration but do not
/// participate in `Dignity == Exaltation` evaluation; membership is by sign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub sign: Sign,
    pub degree: Option<f64>,
}

impl Placement {
    fn at(sign: Sign, degree: f64) -> Placement {
        Placement {
            sign,
            degree: Some(degree),
        }
    }
}

/// Exact angle and maximum orb for one aspect kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectSpec {
    pub angle: f64,
    pub orb: f64,
}

/// Immutable dignity and aspect tables for one mode.
#[derive(Debug, Clone, PartialEq)]
pub struct DignityConfig {
    mode: Mode,
    rulers: BTreeMap<Sign, SmallVec<[Planet; 2]>>,
    exaltations: BTreeMap<Planet, Placement>,
    falls: BTreeMap<Planet, Placement>,
    detriments: BTreeMap<Planet, Vec<Sign>>,
    aspects: BTreeMap<AspectKind, AspectSpec>,
}

impl DignityConfig {
    /// The seven classical rulerships, exaltations with their traditional
    /// degrees, and the falls and detriments opposite them.
    pub fn traditional() -> DignityConfig {
        let rulers: BTreeMap<Sign, SmallVec<[Planet; 2]>> = BTreeMap::from([
            (Sign::Aries, smallvec![Planet::Mars]),
            (Sign::Taurus, smallvec![Planet::Venus]),
            (Sign::Gemini, smallvec![Planet::Mercury]),
            (Sign::Cancer, smallvec![Planet::Moon]),
            (Sign::Leo, smallvec![Planet::Sun]),
            (Sign::Virgo, smallvec![Planet::Mercury]),
            (Sign::Libra, smallvec![Planet::Venus]),
            (Sign::Scorpio, smallvec![Planet::Mars]),
            (Sign::Sagittarius, smallvec![Planet::Jupiter]),
            (Sign::Capricorn, smallvec![Planet::Saturn]),
            (Sign::Aquarius, smallvec![Planet::Saturn]),
            (Sign::Pisces, smallvec![Planet::Jupiter]),
        ]);

        let exaltations = BTreeMap::from([
            (Planet::Sun, Placement::at(Sign::Aries, 19.0)),
            (Planet::Moon, Placement::at(Sign::Taurus, 3.0)),
            (Planet::Mercury, Placement::at(Sign::Virgo, 15.0)),
            (Planet::Venus, Placement::at(Sign::Pisces, 27.0)),
            (Planet::Mars, Placement::at(Sign::Capricorn, 28.0)),
            (Planet::Jupiter, Placement::at(Sign::Cancer, 15.0)),
            (Planet::Saturn, Placement::at(Sign::Libra, 21.0)),
        ]);

        // Fall is the sign opposite the exaltation.
        let falls = exaltations
            .iter()
            .map(|(planet, placement)| {
                (
                    *planet,
                    Placement {
                        sign: placement.sign.opposite(),
                        degree: placement.degree,
                    },
                )
            })
            .collect();

        // Detriment is opposite each ruled sign.
        let mut detriments: BTreeMap<Planet, Vec<Sign>> = BTreeMap::new();
        for (sign, planets) in &rulers {
            for planet in planets {
                detriments.entry(*planet).or_default().push(sign.opposite());
            }
        }
        for signs in detriments.values_mut() {
            signs.sort();
            signs.dedup();
        }

        let aspects = AspectKind::ALL
            .iter()
            .map(|kind| {
                (
                    *kind,
                    AspectSpec {
                        angle: kind.angle(),
                        orb: kind.default_orb(),
                    },
                )
            })
            .collect();

        DignityConfig {
            mode: Mode::Traditional,
            rulers,
            exaltations,
            falls,
            detriments,
            aspects,
        }
    }

    /// The traditional tables plus the outer planets as co-rulers.
    pub fn modern() -> DignityConfig {
        let mut config = DignityConfig::traditional();
        config.mode = Mode::Modern;
        for (sign, co_ruler) in [
            (Sign::Scorpio, Planet::Pluto),
            (Sign::Aquarius, Planet::Uranus),
            (Sign::Pisces, Planet::Neptune),
        ] {
            config.rulers.entry(sign).or_default().push(co_ruler);
            config
                .detriments
                .entry(co_ruler)
                .or_default()
                .push(sign.opposite());
        }
        config
    }

    /// Built-in tables for the given mode.
    pub fn for_mode(mode: Mode) -> DignityConfig {
        match mode {
            Mode::Traditional => DignityConfig::traditional(),
            Mode::Modern => DignityConfig::modern(),
        }
    }

    /// Load a configuration document, overlaying the mode's built-ins.
    pub fn from_json_str(json: &str) -> Result<DignityConfig, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        raw.resolve()
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<DignityConfig, ConfigError> {
        let raw: RawConfig = serde_json::from_reader(reader)
            .map_err(ConfigError::Parse)?;
        raw.resolve()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Ruling planet(s) of a sign. Two entries under modern mode for signs
    /// with a co-ruler.
    pub fn rulers_of(&self, sign: Sign) -> &[Planet] {
        self.rulers.get(&sign).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Sign(s) a planet rules, derived by reverse lookup.
    pub fn signs_ruled_by(&self, planet: Planet) -> SmallVec<[Sign; 2]> {
        self.rulers
            .iter()
            .filter(|(_, planets)| planets.contains(&planet))
            .map(|(sign, _)| *sign)
            .collect()
    }

    pub fn exaltation(&self, planet: Planet) -> Option<Sign> {
        self.exaltations.get(&planet).map(|p| p.sign)
    }

    pub fn exaltation_degree(&self, planet: Planet) -> Option<f64> {
        self.exaltations.get(&planet).and_then(|p| p.degree)
    }

    pub fn fall(&self, planet: Planet) -> Option<Sign> {
        self.falls.get(&planet).map(|p| p.sign)
    }

    pub fn detriments(&self, planet: Planet) -> &[Sign] {
        self.detriments
            .get(&planet)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Canonical orb for an aspect kind, used when a formula does not pass
    /// an explicit `orb<` bound.
    pub fn canonical_orb(&self, kind: AspectKind) -> f64 {
        self.aspects
            .get(&kind)
            .map(|spec| spec.orb)
            .unwrap_or_else(|| kind.default_orb())
    }

    pub fn aspect_angle(&self, kind: AspectKind) -> f64 {
        self.aspects
            .get(&kind)
            .map(|spec| spec.angle)
            .unwrap_or_else(|| kind.angle())
    }

    /// Essential dignity a planet would hold in a sign under these tables.
    pub fn dignity_in(&self, planet: Planet, sign: Sign) -> Dignity {
        if self.rulers_of(sign).contains(&planet) {
            Dignity::Rulership
        } else if self.exaltation(planet) == Some(sign) {
            Dignity::Exaltation
        } else if self.detriments(planet).contains(&sign) {
            Dignity::Detriment
        } else if self.fall(planet) == Some(sign) {
            Dignity::Fall
        } else {
            Dignity::Peregrine
        }
    }
}

// ============================================
// Raw document form
// ============================================

/// Wire form of a placement: either a bare sign name or `{ sign, degree }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPlacement {
    Sign(String),
    WithDegree { sign: String, degree: f64 },
}

impl RawPlacement {
    fn resolve(&self) -> Result<Placement, ChartError> {
        match self {
            RawPlacement::Sign(name) => Ok(Placement {
                sign: name.parse()?,
                degree: None,
            }),
            RawPlacement::WithDegree { sign, degree } => Ok(Placement {
                sign: sign.parse()?,
                degree: Some(*degree),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    mode: Option<Mode>,
    #[serde(default)]
    rulers: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    exaltations: Option<BTreeMap<String, RawPlacement>>,
    #[serde(default)]
    falls: Option<BTreeMap<String, RawPlacement>>,
    #[serde(default)]
    detriments: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    aspects: Option<BTreeMap<String, AspectSpec>>,
}

impl RawConfig {
    fn resolve(self) -> Result<DignityConfig, ConfigError> {
        let mode = self.mode.unwrap_or(Mode::Modern);
        let mut config = DignityConfig::for_mode(mode);

        if let Some(rulers) = self.rulers {
            for (sign, planets) in rulers {
                let sign: Sign = sign.parse()?;
                let mut resolved: SmallVec<[Planet; 2]> = SmallVec::new();
                for name in planets {
                    resolved.push(name.parse::<Planet>()?);
                }
                if resolved.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "sign {sign} has an empty ruler list"
                    )));
                }
                config.rulers.insert(sign, resolved);
            }
        }

        if let Some(exaltations) = self.exaltations {
            for (planet, placement) in exaltations {
                let planet: Planet = planet.parse()?;
                config.exaltations.insert(planet, placement.resolve()?);
            }
        }

        if let Some(falls) = self.falls {
            for (planet, placement) in falls {
                let planet: Planet = planet.parse()?;
                config.falls.insert(planet, placement.resolve()?);
            }
        }

        if let Some(detriments) = self.detriments {
            for (planet, signs) in detriments {
                let planet: Planet = planet.parse()?;
                let mut resolved = Vec::with_capacity(signs.len());
                for name in signs {
                    resolved.push(name.parse::<Sign>()?);
                }
                config.detriments.insert(planet, resolved);
            }
        }

        if let Some(aspects) = self.aspects {
            for (kind, spec) in aspects {
                let kind: AspectKind = kind.parse()?;
                if spec.orb < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "aspect {kind} has a negative orb"
                    )));
                }
                config.aspects.insert(kind, spec);
            }
        }

        Ok(config)
    }
}
