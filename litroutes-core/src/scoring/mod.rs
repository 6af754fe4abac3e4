//! Per-edge danger scoring.
//!
//! The score starts from a base risk and is moved by lighting, curvature,
//! road class, land use and speed terms, then clamped to `[0, 150]`.
//! Scoring is pure: the same inputs always give the same output.

pub mod categories;

use geo::LineString;
use serde::{Deserialize, Serialize};

pub use categories::{LandUseCategory, RoadClass, parse_maxspeed};

use crate::geomath::{chord_length_m, line_length_m};

/// Label attached to edges with no overlapping land-use zone
pub const UNKNOWN_LAND_LABEL: &str = "Unknown";

/// Constants of the danger model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    pub base_risk: f64,
    /// Subtracted once when at least one light covers the edge
    pub light_bonus: f64,
    /// Saturation rate of the darkness function, per light per meter
    pub darkness_saturation: f64,
    pub curvature_threshold: f64,
    pub curvature_weight: f64,
    pub curvature_cap: f64,
    pub highway_weight: f64,
    pub land_weight: f64,
    /// Land risk of edges with no known land use
    pub neutral_land_risk: f64,
    pub speed_threshold_kph: f64,
    pub speed_weight: f64,
    pub min_danger: f64,
    pub max_danger: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            base_risk: 100.0,
            light_bonus: 90.0,
            darkness_saturation: 50.0,
            curvature_threshold: 1.15,
            curvature_weight: 100.0,
            curvature_cap: 30.0,
            highway_weight: 30.0,
            land_weight: 20.0,
            neutral_land_risk: 0.6,
            speed_threshold_kph: 50.0,
            speed_weight: 1.0,
            min_danger: 0.0,
            max_danger: 150.0,
        }
    }
}

impl ScoringParams {
    /// # Errors
    ///
    /// Returns a description of the first inconsistent constant.
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            self.base_risk,
            self.light_bonus,
            self.darkness_saturation,
            self.curvature_threshold,
            self.curvature_weight,
            self.curvature_cap,
            self.highway_weight,
            self.land_weight,
            self.neutral_land_risk,
            self.speed_threshold_kph,
            self.speed_weight,
            self.min_danger,
            self.max_danger,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err("scoring constants must be finite and non-negative".into());
        }
        if self.min_danger > self.max_danger {
            return Err(format!(
                "min_danger {} exceeds max_danger {}",
                self.min_danger, self.max_danger
            ));
        }
        if !(0.0..=1.0).contains(&self.neutral_land_risk) {
            return Err("neutral_land_risk must lie in [0, 1]".into());
        }
        Ok(())
    }
}

/// Raw attributes of one edge, as seen by the scorer
#[derive(Debug, Clone, Copy)]
pub struct EdgeContext<'a> {
    pub geometry: &'a LineString<f64>,
    pub length_m: f64,
    pub speed_kph: f64,
    pub road_class: RoadClass,
    /// Lights within the buffer around the edge
    pub light_count: u32,
    /// Label of the dominant overlapping land-use zone
    pub land_label: Option<&'a str>,
}

/// Derived safety attributes of an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSafety {
    pub light_count: u32,
    pub curvature_score: f64,
    pub darkness_score: f64,
    pub highway_risk: f64,
    pub land_risk: f64,
    pub land_label: String,
    pub danger_score: f64,
}

/// Score one edge
pub fn score_edge(edge: &EdgeContext<'_>, params: &ScoringParams) -> EdgeSafety {
    let mut danger = params.base_risk;

    if edge.light_count > 0 {
        danger -= params.light_bonus;
    }
    let darkness_score = darkness(edge.light_count, edge.length_m, params);

    let curvature_score = curvature(edge.geometry);
    if curvature_score > params.curvature_threshold {
        danger += ((curvature_score - params.curvature_threshold) * params.curvature_weight)
            .min(params.curvature_cap);
    }

    let highway_risk = edge.road_class.risk();
    danger += highway_risk * params.highway_weight;

    let (land_risk, land_label) = match edge.land_label {
        Some(label) => (
            LandUseCategory::from_label(label)
                .risk()
                .unwrap_or(params.neutral_land_risk),
            label.to_string(),
        ),
        None => (params.neutral_land_risk, UNKNOWN_LAND_LABEL.to_string()),
    };
    danger += land_risk * params.land_weight;

    if edge.speed_kph > params.speed_threshold_kph {
        danger += (edge.speed_kph - params.speed_threshold_kph) * params.speed_weight;
    }

    EdgeSafety {
        light_count: edge.light_count,
        curvature_score,
        darkness_score,
        highway_risk,
        land_risk,
        land_label,
        danger_score: danger.clamp(params.min_danger, params.max_danger),
    }
}

/// Path length over endpoint distance, never below 1
pub fn curvature(geometry: &LineString<f64>) -> f64 {
    let chord = chord_length_m(geometry);
    if chord < 1.0 {
        return 1.0;
    }
    (line_length_m(geometry) / chord).max(1.0)
}

/// Complement of a saturating function of light density: 1 when dark, towards 0 when lit
pub fn darkness(light_count: u32, length_m: f64, params: &ScoringParams) -> f64 {
    let lights_per_m = f64::from(light_count) / length_m.max(1.0);
    1.0 / (1.0 + lights_per_m * params.darkness_saturation)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::line_string;

    use super::*;

    fn straight() -> LineString<f64> {
        line_string![(x: -82.47, y: 35.359), (x: -82.47, y: 35.350)]
    }

    fn context(geometry: &LineString<f64>) -> EdgeContext<'_> {
        EdgeContext {
            geometry,
            length_m: 1000.0,
            speed_kph: 60.0,
            road_class: RoadClass::Primary,
            light_count: 0,
            land_label: None,
        }
    }

    #[test]
    fn unlit_fast_primary() {
        let geometry = straight();
        let safety = score_edge(&context(&geometry), &ScoringParams::default());

        // 100 + 0.7 * 30 + 0.6 * 20 + (60 - 50)
        assert_abs_diff_eq!(safety.danger_score, 143.0, epsilon = 1e-9);
        assert_abs_diff_eq!(safety.curvature_score, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(safety.darkness_score, 1.0);
        assert_eq!(safety.land_label, UNKNOWN_LAND_LABEL);
    }

    #[test]
    fn one_light_gives_the_full_bonus() {
        let geometry = straight();
        let params = ScoringParams::default();
        let mut edge = context(&geometry);
        edge.light_count = 1;
        let one = score_edge(&edge, &params);
        edge.light_count = 12;
        let many = score_edge(&edge, &params);

        assert_abs_diff_eq!(one.danger_score, 53.0, epsilon = 1e-9);
        assert_abs_diff_eq!(one.danger_score, many.danger_score);
        assert!(many.darkness_score < one.darkness_score);
        assert_abs_diff_eq!(one.darkness_score, 1.0 / 1.05, epsilon = 1e-12);
    }

    #[test]
    fn curvature_penalty_is_capped() {
        let zigzag = line_string![
            (x: -82.470, y: 35.350),
            (x: -82.460, y: 35.351),
            (x: -82.470, y: 35.352),
            (x: -82.460, y: 35.353),
            (x: -82.470, y: 35.354),
        ];
        let params = ScoringParams::default();
        let geometry = straight();
        let mut plain = context(&geometry);
        plain.light_count = 1;
        let mut edge = context(&zigzag);
        edge.light_count = 1;
        let plain = score_edge(&plain, &params);
        let curvy = score_edge(&edge, &params);

        assert!(curvy.curvature_score > 8.0);
        assert_abs_diff_eq!(curvy.danger_score, plain.danger_score + 30.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_geometry_has_unit_curvature() {
        let point = line_string![(x: -82.47, y: 35.35), (x: -82.47, y: 35.35)];
        assert_abs_diff_eq!(curvature(&point), 1.0);
        assert_abs_diff_eq!(curvature(&LineString::new(vec![])), 1.0);
    }

    #[test]
    fn land_use_label_drives_land_risk() {
        let geometry = straight();
        let params = ScoringParams::default();
        let mut edge = context(&geometry);

        edge.land_label = Some("Industrial");
        let industrial = score_edge(&edge, &params);
        assert_abs_diff_eq!(industrial.land_risk, 1.0);
        assert_eq!(industrial.land_label, "Industrial");

        edge.land_label = Some("cemetery");
        let other = score_edge(&edge, &params);
        assert_abs_diff_eq!(other.land_risk, params.neutral_land_risk);
        assert_eq!(other.land_label, "cemetery");
    }

    #[test]
    fn danger_stays_in_range() {
        let geometry = straight();
        let params = ScoringParams::default();
        let mut edge = context(&geometry);
        edge.speed_kph = 400.0;
        edge.road_class = RoadClass::Motorway;
        assert_abs_diff_eq!(score_edge(&edge, &params).danger_score, 150.0);

        let lit = ScoringParams {
            light_bonus: 500.0,
            ..ScoringParams::default()
        };
        edge.light_count = 3;
        edge.speed_kph = 10.0;
        assert_abs_diff_eq!(score_edge(&edge, &lit).danger_score, 0.0);
    }

    #[test]
    fn params_validation() {
        assert!(ScoringParams::default().validate().is_ok());
        let inverted = ScoringParams {
            min_danger: 200.0,
            ..ScoringParams::default()
        };
        assert!(inverted.validate().is_err());
    }
}
