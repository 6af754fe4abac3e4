//! Road-class and land-use category tables.

use serde::{Deserialize, Serialize};

/// Road class parsed from an OSM-style `highway` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Unclassified,
    Residential,
    LivingStreet,
    Service,
    Path,
    Unknown,
}

impl RoadClass {
    /// Parse a tag; `_link` variants map to their base class
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return RoadClass::Unknown;
        };
        let tag = tag.trim().to_ascii_lowercase();
        let base = tag.strip_suffix("_link").unwrap_or(&tag);

        match base {
            "motorway" => RoadClass::Motorway,
            "trunk" => RoadClass::Trunk,
            "primary" => RoadClass::Primary,
            "secondary" => RoadClass::Secondary,
            "tertiary" => RoadClass::Tertiary,
            "unclassified" | "road" => RoadClass::Unclassified,
            "residential" => RoadClass::Residential,
            "living_street" => RoadClass::LivingStreet,
            "service" => RoadClass::Service,
            "track" | "path" | "footway" | "cycleway" | "pedestrian" | "bridleway" | "steps" => {
                RoadClass::Path
            }
            _ => RoadClass::Unknown,
        }
    }

    /// Lowest-risk class among several tags, as carried by merged ways
    pub fn safest_of<'a>(tags: impl IntoIterator<Item = &'a str>) -> Option<(RoadClass, &'a str)> {
        tags.into_iter()
            .map(|tag| (RoadClass::from_tag(Some(tag)), tag))
            .filter(|(class, _)| *class != RoadClass::Unknown)
            .min_by(|(a, _), (b, _)| a.risk().total_cmp(&b.risk()))
    }

    /// Risk in `[0, 1]`: limited-access > arterial > residential > path.
    /// Unknown tags are treated as highest risk.
    pub fn risk(self) -> f64 {
        match self {
            RoadClass::Motorway | RoadClass::Unknown => 1.0,
            RoadClass::Trunk => 0.9,
            RoadClass::Primary => 0.7,
            RoadClass::Secondary => 0.6,
            RoadClass::Tertiary => 0.5,
            RoadClass::Unclassified => 0.4,
            RoadClass::Residential => 0.3,
            RoadClass::LivingStreet | RoadClass::Service => 0.2,
            RoadClass::Path => 0.1,
        }
    }

    /// Free-flow speed used when the source carries none, km/h
    pub fn default_speed_kph(self) -> f64 {
        match self {
            RoadClass::Motorway => 100.0,
            RoadClass::Trunk => 80.0,
            RoadClass::Primary => 65.0,
            RoadClass::Secondary => 55.0,
            RoadClass::Tertiary => 45.0,
            RoadClass::Unclassified | RoadClass::Unknown => 40.0,
            RoadClass::Residential => 30.0,
            RoadClass::Service => 20.0,
            RoadClass::LivingStreet | RoadClass::Path => 15.0,
        }
    }
}

/// Broad land-use category derived from a zone label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LandUseCategory {
    Industrial,
    Undeveloped,
    Residential,
    Water,
    Commercial,
    Other,
}

impl LandUseCategory {
    pub fn from_label(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| label.contains(w));

        // "undeveloped" must be tested before any "developed" match
        if has(&["industrial", "quarry", "landfill", "railway", "brownfield"]) {
            LandUseCategory::Industrial
        } else if has(&[
            "undeveloped",
            "forest",
            "wood",
            "wetland",
            "barren",
            "scrub",
            "grass",
            "meadow",
            "heath",
            "farm",
            "crop",
            "pasture",
            "orchard",
        ]) {
            LandUseCategory::Undeveloped
        } else if has(&["commercial", "retail", "developed high", "developed medium"]) {
            LandUseCategory::Commercial
        } else if has(&["residential", "developed low", "developed open"]) {
            LandUseCategory::Residential
        } else if has(&["water", "reservoir", "basin", "ice", "snow"]) {
            LandUseCategory::Water
        } else {
            LandUseCategory::Other
        }
    }

    /// Risk in `[0, 1]`; `None` for categories that fall back to the neutral value
    pub fn risk(self) -> Option<f64> {
        match self {
            LandUseCategory::Industrial => Some(1.0),
            LandUseCategory::Undeveloped => Some(0.8),
            LandUseCategory::Residential => Some(0.5),
            LandUseCategory::Water => Some(0.3),
            LandUseCategory::Commercial => Some(0.2),
            LandUseCategory::Other => None,
        }
    }
}

/// Parse an OSM `maxspeed` value ("50", "35 mph", "50;70") into km/h
pub fn parse_maxspeed(value: &str) -> Option<f64> {
    let first = value.split(';').next()?.trim().to_ascii_lowercase();
    let (number, factor) = match first.strip_suffix("mph") {
        Some(rest) => (rest.trim(), 1.609_344),
        None => (first.trim_end_matches("km/h").trim(), 1.0),
    };
    number
        .parse::<f64>()
        .ok()
        .filter(|speed| speed.is_finite() && *speed > 0.0)
        .map(|speed| speed * factor)
}
