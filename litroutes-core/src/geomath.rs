//! Small spherical and planar helpers shared by the builder and the snapper.

use geo::{Coord, Distance, Euclidean, Haversine, Line, LineString, Point};
use serde::{Deserialize, Serialize};

/// Mean earth radius, matching the one behind [`Haversine`]
pub const EARTH_RADIUS_APPROX: f64 = 6_371_008.8;

/// Great-circle distance in meters between two lon/lat coordinates
pub fn haversine_m(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Haversine.distance(Point::from(a), Point::from(b))
}

/// Great-circle length of a polyline in meters
pub fn line_length_m(line: &LineString<f64>) -> f64 {
    line.lines()
        .map(|segment| haversine_m(segment.start, segment.end))
        .sum()
}

/// Great-circle distance between the first and last vertex of a polyline
pub fn chord_length_m(line: &LineString<f64>) -> f64 {
    match (line.0.first(), line.0.last()) {
        (Some(first), Some(last)) => haversine_m(*first, *last),
        _ => 0.0,
    }
}

/// Equirectangular projection around a fixed origin, in meters.
///
/// Accurate to well under a percent over a city-sized service area, which is
/// what the snapper and the light buffer need.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalProjection {
    origin_lat: f64,
    origin_lon: f64,
    cos_lat: f64,
}

impl LocalProjection {
    pub fn new(origin_lat: f64, origin_lon: f64) -> Self {
        Self {
            origin_lat,
            origin_lon,
            cos_lat: origin_lat.to_radians().cos(),
        }
    }

    /// Project a lon/lat coordinate to planar meters
    pub fn project(&self, coord: Coord<f64>) -> [f64; 2] {
        let meters_per_degree = EARTH_RADIUS_APPROX.to_radians();
        [
            (coord.x - self.origin_lon) * self.cos_lat * meters_per_degree,
            (coord.y - self.origin_lat) * meters_per_degree,
        ]
    }

    pub fn project_line(&self, line: &LineString<f64>) -> Vec<[f64; 2]> {
        line.0.iter().map(|c| self.project(*c)).collect()
    }
}

/// Planar distance from `p` to the segment `a`-`b`
pub fn point_segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    Euclidean.distance(&Point::from(p), &Line::new(a, b))
}

/// Planar distance from `p` to a projected polyline
pub fn point_polyline_distance(p: [f64; 2], line: &[[f64; 2]]) -> f64 {
    match line {
        [] => f64::INFINITY,
        [single] => Euclidean.distance(Point::from(p), Point::from(*single)),
        _ => line
            .windows(2)
            .map(|seg| point_segment_distance(p, seg[0], seg[1]))
            .fold(f64::INFINITY, f64::min),
    }
}
