//! Street network components - nodes and attributed edges

use geo::{LineString, Point};
use serde::{Deserialize, Serialize};

use crate::{Meters, NodeId, Seconds, model::LatLon, scoring::EdgeSafety};

/// Street graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetNode {
    /// Id issued by the street-network source
    pub id: NodeId,
    /// Node coordinates (x = lon, y = lat)
    pub geometry: Point<f64>,
}

impl StreetNode {
    pub fn lat_lon(&self) -> LatLon {
        LatLon::new(self.geometry.y(), self.geometry.x())
    }
}

/// Street graph edge (directed street segment) with its safety attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetEdge {
    pub from: NodeId,
    pub to: NodeId,
    /// Vertices ordered from `from` to `to`
    pub geometry: LineString<f64>,
    pub length_m: Meters,
    /// Free-flow travel time
    pub travel_time_s: Seconds,
    pub speed_kph: f64,
    pub highway: Option<String>,
    pub name: Option<String>,
    pub safety: EdgeSafety,
}

impl StreetEdge {
    pub fn danger_score(&self) -> f64 {
        self.safety.danger_score
    }

    /// Danger per meter, undefined for zero-length edges
    pub fn danger_per_length(&self) -> Option<f64> {
        (self.length_m > 0.0).then(|| self.safety.danger_score / self.length_m)
    }

    /// Weight of the danger-optimal criterion: `length * (1 + danger / 100)`.
    ///
    /// Danger scales the length instead of replacing it, so a safer detour only
    /// wins while its extra length is outweighed by the danger it saves.
    pub fn danger_weight(&self) -> f64 {
        self.length_m * (1.0 + self.safety.danger_score / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::line_string;

    use super::*;

    fn edge(length_m: f64, danger_score: f64) -> StreetEdge {
        StreetEdge {
            from: 1,
            to: 2,
            geometry: line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 0.01)],
            length_m,
            travel_time_s: length_m / 10.0,
            speed_kph: 36.0,
            highway: Some("residential".into()),
            name: None,
            safety: EdgeSafety {
                light_count: 0,
                curvature_score: 1.0,
                darkness_score: 1.0,
                highway_risk: 0.3,
                land_risk: 0.6,
                land_label: "Unknown".into(),
                danger_score,
            },
        }
    }

    #[test]
    fn danger_per_length_is_undefined_for_zero_length() {
        assert!(edge(0.0, 40.0).danger_per_length().is_none());
        assert_abs_diff_eq!(edge(200.0, 40.0).danger_per_length().unwrap(), 0.2);
    }

    #[test]
    fn danger_weight_scales_length() {
        assert_abs_diff_eq!(edge(1000.0, 143.0).danger_weight(), 2430.0, epsilon = 1e-9);
        assert_abs_diff_eq!(edge(1000.0, 0.0).danger_weight(), 1000.0);
        // a longer safe edge can still lose to a shorter dangerous one
        assert!(edge(3000.0, 0.0).danger_weight() > edge(1000.0, 150.0).danger_weight());
    }
}
