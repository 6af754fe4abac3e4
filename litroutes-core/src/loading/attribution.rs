//! Spatial matching of lights and land-use zones to street edges.

use geo::{Contains, LineString, Point};
use hashbrown::HashMap;
use rstar::{AABB, RTree, primitives::GeomWithData, primitives::Rectangle};

use super::raw_types::{LandUseZone, StreetLight};
use crate::geomath::{LocalProjection, haversine_m, point_polyline_distance};

/// Projected light positions, queried by distance to an edge
pub struct LightIndex {
    rtree: RTree<[f64; 2]>,
    projection: LocalProjection,
    buffer_m: f64,
}

impl LightIndex {
    pub fn new(lights: &[StreetLight], projection: LocalProjection, buffer_m: f64) -> Self {
        let points = lights
            .iter()
            .filter(|light| light.is_finite())
            .map(|light| projection.project(light.to_coord()))
            .collect();
        Self {
            rtree: RTree::bulk_load(points),
            projection,
            buffer_m,
        }
    }

    /// Number of lights within the buffer distance of the polyline
    pub fn count_near(&self, line: &LineString<f64>) -> u32 {
        let projected = self.projection.project_line(line);
        let Some(envelope) = envelope(&projected, self.buffer_m) else {
            return 0;
        };

        let count = self
            .rtree
            .locate_in_envelope(&envelope)
            .filter(|light| point_polyline_distance(**light, &projected) <= self.buffer_m)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

fn envelope(points: &[[f64; 2]], buffer: f64) -> Option<AABB<[f64; 2]>> {
    let first = points.first()?;
    let (mut min, mut max) = (*first, *first);
    for p in points {
        min = [min[0].min(p[0]), min[1].min(p[1])];
        max = [max[0].max(p[0]), max[1].max(p[1])];
    }
    Some(AABB::from_corners(
        [min[0] - buffer, min[1] - buffer],
        [max[0] + buffer, max[1] + buffer],
    ))
}

type ZoneBounds = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Land-use zones indexed by bounding rectangle (lon/lat degrees)
pub struct LandUseIndex<'a> {
    zones: &'a [LandUseZone],
    rtree: RTree<ZoneBounds>,
}

impl<'a> LandUseIndex<'a> {
    pub fn new(zones: &'a [LandUseZone]) -> Self {
        let bounds = zones
            .iter()
            .enumerate()
            .map(|(idx, zone)| {
                let (min, max) = (zone.bounds.min(), zone.bounds.max());
                ZoneBounds::new(Rectangle::from_corners([min.x, min.y], [max.x, max.y]), idx)
            })
            .collect();
        Self {
            zones,
            rtree: RTree::bulk_load(bounds),
        }
    }

    /// Land-use label covering the largest share of the polyline.
    ///
    /// Each segment is assigned to the zones containing its midpoint, and
    /// coverage is summed per label (case-insensitive) across all zones
    /// carrying it. Ties go to the lexicographically smaller label.
    pub fn dominant_label(&self, line: &LineString<f64>) -> Option<&'a str> {
        let mut covered: HashMap<String, (f64, &'a str)> = HashMap::new();

        for segment in line.0.windows(2) {
            let (a, b) = (segment[0], segment[1]);
            let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
            let length = haversine_m(a, b);

            for candidate in self
                .rtree
                .locate_in_envelope_intersecting(&AABB::from_point([mid.x(), mid.y()]))
            {
                let zone = &self.zones[candidate.data];
                if zone.geometry.contains(&mid) {
                    let label = zone.label.as_str();
                    let entry = covered
                        .entry(label.trim().to_ascii_lowercase())
                        .or_insert((0.0, label));
                    entry.0 += length;
                    if label < entry.1 {
                        entry.1 = label;
                    }
                }
            }
        }

        covered
            .into_iter()
            .min_by(|(ka, (la, _)), (kb, (lb, _))| lb.total_cmp(la).then_with(|| ka.cmp(kb)))
            .map(|(_, (_, label))| label)
    }
}
