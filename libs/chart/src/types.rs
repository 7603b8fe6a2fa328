//! Astrological vocabulary: planets, signs, angles, aspect kinds, dignities
//!
//! Name resolution is case-insensitive and backed by compile-time perfect
//! hash maps, so formula identifiers resolve in O(1) with zero runtime
//! allocation. `Display` always renders the canonical capitalized form used
//! in diagnostics and pretty-printed formulas.

use crate::error::ChartError;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A chart body addressable in formulas.
///
/// The first ten variants are the classical planet set enumerated by the
/// `planet`/`planets` aggregation domain; the remainder are optional extra
/// points a chart producer may include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Planet {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
    Chiron,
    Lilith,
    NorthNode,
    SouthNode,
}

static PLANETS_BY_NAME: phf::Map<&'static str, Planet> = phf_map! {
    "sun" => Planet::Sun,
    "moon" => Planet::Moon,
    "mercury" => Planet::Mercury,
    "venus" => Planet::Venus,
    "mars" => Planet::Mars,
    "jupiter" => Planet::Jupiter,
    "saturn" => Planet::Saturn,
    "uranus" => Planet::Uranus,
    "neptune" => Planet::Neptune,
    "pluto" => Planet::Pluto,
    "chiron" => Planet::Chiron,
    "lilith" => Planet::Lilith,
    "northnode" => Planet::NorthNode,
    "north_node" => Planet::NorthNode,
    "southnode" => Planet::SouthNode,
    "south_node" => Planet::SouthNode,
};

impl Planet {
    /// The ten classical planets, in traditional order. This is the default
    /// `planet` aggregation domain.
    pub const CLASSICAL: [Planet; 10] = [
        Planet::Sun,
        Planet::Moon,
        Planet::Mercury,
        Planet::Venus,
        Planet::Mars,
        Planet::Jupiter,
        Planet::Saturn,
        Planet::Uranus,
        Planet::Neptune,
        Planet::Pluto,
    ];

    /// Sun and Moon. Luminaries are never retrograde.
    pub fn is_luminary(self) -> bool {
        matches!(self, Planet::Sun | Planet::Moon)
    }

    /// Uranus, Neptune, Pluto: rulers only in the modern scheme.
    pub fn is_modern_ruler(self) -> bool {
        matches!(self, Planet::Uranus | Planet::Neptune | Planet::Pluto)
    }

    /// Case-insensitive name lookup, `None` for unknown names.
    pub fn lookup(name: &str) -> Option<Planet> {
        PLANETS_BY_NAME.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Planet::Sun => "Sun",
            Planet::Moon => "Moon",
            Planet::Mercury => "Mercury",
            Planet::Venus => "Venus",
            Planet::Mars => "Mars",
            Planet::Jupiter => "Jupiter",
            Planet::Saturn => "Saturn",
            Planet::Uranus => "Uranus",
            Planet::Neptune => "Neptune",
            Planet::Pluto => "Pluto",
            Planet::Chiron => "Chiron",
            Planet::Lilith => "Lilith",
            Planet::NorthNode => "NorthNode",
            Planet::SouthNode => "SouthNode",
        }
    }
}

impl fmt::Display for Planet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Planet {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Planet::lookup(s).ok_or_else(|| ChartError::UnknownPlanet(s.to_string()))
    }
}

/// The twelve zodiac signs, in ecliptic order starting at 0° Aries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

static SIGNS_BY_NAME: phf::Map<&'static str, Sign> = phf_map! {
    "aries" => Sign::Aries,
    "taurus" => Sign::Taurus,
    "gemini" => Sign::Gemini,
    "cancer" => Sign::Cancer,
    "leo" => Sign::Leo,
    "virgo" => Sign::Virgo,
    "libra" => Sign::Libra,
    "scorpio" => Sign::Scorpio,
    "sagittarius" => Sign::Sagittarius,
    "capricorn" => Sign::Capricorn,
    "aquarius" => Sign::Aquarius,
    "pisces" => Sign::Pisces,
};

impl Sign {
    pub const ALL: [Sign; 12] = [
        Sign::Aries,
        Sign::Taurus,
        Sign::Gemini,
        Sign::Cancer,
        Sign::Leo,
        Sign::Virgo,
        Sign::Libra,
        Sign::Scorpio,
        Sign::Sagittarius,
        Sign::Capricorn,
        Sign::Aquarius,
        Sign::Pisces,
    ];

    /// Sign occupied by an ecliptic longitude. The longitude is normalized
    /// into `[0, 360)` first, so negative and overshooting inputs are fine.
    pub fn from_longitude(longitude: f64) -> Sign {
        let normalized = longitude.rem_euclid(360.0);
        Sign::ALL[(normalized / 30.0) as usize % 12]
    }

    /// The sign 180° away. Falls and detriments sit opposite exaltations
    /// and rulerships.
    pub fn opposite(self) -> Sign {
        Sign::ALL[(self as usize + 6) % 12]
    }

    pub fn lookup(name: &str) -> Option<Sign> {
        SIGNS_BY_NAME.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Sign::Aries => "Aries",
            Sign::Taurus => "Taurus",
            Sign::Gemini => "Gemini",
            Sign::Cancer => "Cancer",
            Sign::Leo => "Leo",
            Sign::Virgo => "Virgo",
            Sign::Libra => "Libra",
            Sign::Scorpio => "Scorpio",
            Sign::Sagittarius => "Sagittarius",
            Sign::Capricorn => "Capricorn",
            Sign::Aquarius => "Aquarius",
            Sign::Pisces => "Pisces",
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Sign {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sign::lookup(s).ok_or_else(|| ChartError::UnknownSign(s.to_string()))
    }
}

/// Chart angles. Addressable in formulas like planets, but derived from the
/// house cusps rather than carried as planet states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Angle {
    Asc,
    Mc,
    Ic,
    Dsc,
}

static ANGLES_BY_NAME: phf::Map<&'static str, Angle> = phf_map! {
    "asc" => Angle::Asc,
    "ascendant" => Angle::Asc,
    "mc" => Angle::Mc,
    "midheaven" => Angle::Mc,
    "ic" => Angle::Ic,
    "dsc" => Angle::Dsc,
    "desc" => Angle::Dsc,
    "descendant" => Angle::Dsc,
};

impl Angle {
    /// Index into the cusp array: Asc is the 1st cusp, IC the 4th, Dsc the
    /// 7th, MC the 10th.
    pub fn cusp_index(self) -> usize {
        match self {
            Angle::Asc => 0,
            Angle::Ic => 3,
            Angle::Dsc => 6,
            Angle::Mc => 9,
        }
    }

    pub fn lookup(name: &str) -> Option<Angle> {
        ANGLES_BY_NAME.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Angle::Asc => "Asc",
            Angle::Mc => "MC",
            Angle::Ic => "IC",
            Angle::Dsc => "Dsc",
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Angle {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Angle::lookup(s).ok_or_else(|| ChartError::UnknownAngle(s.to_string()))
    }
}

/// Angular relationships recognized between two planets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AspectKind {
    Conj,
    Opp,
    Trine,
    Square,
    Sextile,
}

static ASPECTS_BY_NAME: phf::Map<&'static str, AspectKind> = phf_map! {
    "conj" => AspectKind::Conj,
    "conjunction" => AspectKind::Conj,
    "opp" => AspectKind::Opp,
    "opposition" => AspectKind::Opp,
    "trine" => AspectKind::Trine,
    "square" => AspectKind::Square,
    "sextile" => AspectKind::Sextile,
};

impl AspectKind {
    pub const ALL: [AspectKind; 5] = [
        AspectKind::Conj,
        AspectKind::Opp,
        AspectKind::Trine,
        AspectKind::Square,
        AspectKind::Sextile,
    ];

    /// Exact angle of the aspect in degrees.
    pub fn angle(self) -> f64 {
        match self {
            AspectKind::Conj => 0.0,
            AspectKind::Opp => 180.0,
            AspectKind::Trine => 120.0,
            AspectKind::Square => 90.0,
            AspectKind::Sextile => 60.0,
        }
    }

    /// Built-in orb used when the configuration document does not override it.
    pub fn default_orb(self) -> f64 {
        match self {
            AspectKind::Sextile => 6.0,
            _ => 8.0,
        }
    }

    pub fn lookup(name: &str) -> Option<AspectKind> {
        ASPECTS_BY_NAME.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            AspectKind::Conj => "Conj",
            AspectKind::Opp => "Opp",
            AspectKind::Trine => "Trine",
            AspectKind::Square => "Square",
            AspectKind::Sextile => "Sextile",
        }
    }
}

impl fmt::Display for AspectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AspectKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectKind::lookup(s).ok_or_else(|| ChartError::UnknownAspect(s.to_string()))
    }
}

/// Essential dignity of a planet in its sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dignity {
    Rulership,
    Exaltation,
    Detriment,
    Fall,
    Neutral,
    Peregrine,
}

static DIGNITIES_BY_NAME: phf::Map<&'static str, Dignity> = phf_map! {
    "rulership" => Dignity::Rulership,
    "domicile" => Dignity::Rulership,
    "exaltation" => Dignity::Exaltation,
    "detriment" => Dignity::Detriment,
    "fall" => Dignity::Fall,
    "neutral" => Dignity::Neutral,
    "peregrine" => Dignity::Peregrine,
};

impl Dignity {
    pub fn lookup(name: &str) -> Option<Dignity> {
        DIGNITIES_BY_NAME.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Dignity::Rulership => "Rulership",
            Dignity::Exaltation => "Exaltation",
            Dignity::Detriment => "Detriment",
            Dignity::Fall => "Fall",
            Dignity::Neutral => "Neutral",
            Dignity::Peregrine => "Peregrine",
        }
    }
}

impl fmt::Display for Dignity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dignity {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dignity::lookup(s).ok_or_else(|| ChartError::UnknownDignity(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planet_lookup_is_case_insensitive() {
        assert_eq!(Planet::lookup("sun"), Some(Planet::Sun));
        assert_eq!(Planet::lookup("SUN"), Some(Planet::Sun));
        assert_eq!(Planet::lookup("Pluto"), Some(Planet::Pluto));
        assert_eq!(Planet::lookup("vulcan"), None);
    }

    #[test]
    fn sign_from_longitude() {
        assert_eq!(Sign::from_longitude(0.0), Sign::Aries);
        assert_eq!(Sign::from_longitude(29.999), Sign::Aries);
        assert_eq!(Sign::from_longitude(30.0), Sign::Taurus);
        assert_eq!(Sign::from_longitude(285.0), Sign::Capricorn);
        assert_eq!(Sign::from_longitude(359.9), Sign::Pisces);
        assert_eq!(Sign::from_longitude(-10.0), Sign::Pisces);
        assert_eq!(Sign::from_longitude(370.0), Sign::Aries);
    }

    #[test]
    fn sign_opposite() {
        assert_eq!(Sign::Aries.opposite(), Sign::Libra);
        assert_eq!(Sign::Capricorn.opposite(), Sign::Cancer);
        assert_eq!(Sign::Pisces.opposite(), Sign::Virgo);
    }

    #[test]
    fn aspect_names_accept_long_forms() {
        assert_eq!(AspectKind::lookup("conjunction"), Some(AspectKind::Conj));
        assert_eq!(AspectKind::lookup("OPP"), Some(AspectKind::Opp));
        assert_eq!("trine".parse::<AspectKind>().unwrap(), AspectKind::Trine);
    }

    #[test]
    fn luminaries_and_modern_rulers() {
        assert!(Planet::Sun.is_luminary());
        assert!(Planet::Moon.is_luminary());
        assert!(!Planet::Mercury.is_luminary());
        assert!(Planet::Pluto.is_modern_ruler());
        assert!(!Planet::Saturn.is_modern_ruler());
    }
}
