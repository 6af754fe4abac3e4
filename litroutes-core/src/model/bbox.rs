//! Service-area bounding box and the key graphs are cached under.

use std::fmt;

use geo::{Coord, Rect, coord};
use serde::{Deserialize, Serialize};

use crate::{BoundSide, Error, OutOfBoundsError};

/// A geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Convert into a `geo` coordinate (x = lon, y = lat)
    pub fn to_coord(self) -> Coord<f64> {
        coord! { x: self.lon, y: self.lat }
    }
}

impl From<(f64, f64)> for LatLon {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Rectangular service area, edges in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BBox {
    /// Create a validated bounding box
    ///
    /// # Errors
    ///
    /// Returns an error if a bound is not finite, out of the valid
    /// latitude/longitude range, or the box has no area.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, Error> {
        let bbox = Self {
            north,
            south,
            east,
            west,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let bounds = [self.north, self.south, self.east, self.west];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(Error::InvalidData(format!("non-finite bbox {self}")));
        }
        if self.north > 90.0 || self.south < -90.0 || self.east > 180.0 || self.west < -180.0 {
            return Err(Error::InvalidData(format!("bbox {self} exceeds the globe")));
        }
        if self.north <= self.south || self.east <= self.west {
            return Err(Error::InvalidData(format!("bbox {self} has no area")));
        }
        Ok(())
    }

    /// Cache key, bounds rounded to five decimals (about a meter)
    pub fn key(&self) -> BBoxKey {
        BBoxKey(format!(
            "{:.5},{:.5},{:.5},{:.5}",
            self.north, self.south, self.east, self.west
        ))
    }

    pub fn centre(&self) -> LatLon {
        LatLon {
            lat: self.south + (self.north - self.south) / 2.0,
            lon: self.west + (self.east - self.west) / 2.0,
        }
    }

    /// Check that a coordinate lies in the box. Points on the boundary are inside.
    ///
    /// # Errors
    ///
    /// Returns the first violated side, checked north, south, east, west.
    pub fn check(&self, lat: f64, lon: f64) -> Result<(), OutOfBoundsError> {
        let violation = if lat > self.north {
            Some((BoundSide::North, self.north))
        } else if lat < self.south {
            Some((BoundSide::South, self.south))
        } else if lon > self.east {
            Some((BoundSide::East, self.east))
        } else if lon < self.west {
            Some((BoundSide::West, self.west))
        } else {
            None
        };

        match violation {
            Some((side, limit)) => Err(OutOfBoundsError {
                lat,
                lon,
                side,
                limit,
                endpoint: None,
            }),
            None => Ok(()),
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.check(lat, lon).is_ok()
    }

    pub fn contains_coord(&self, coord: Coord<f64>) -> bool {
        self.contains(coord.y, coord.x)
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
    }

    /// True when the rectangle `other` overlaps this box
    pub fn intersects_rect(&self, other: &Rect<f64>) -> bool {
        other.min().x <= self.east
            && other.max().x >= self.west
            && other.min().y <= self.north
            && other.max().y >= self.south
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(north={}, south={}, east={}, west={})",
            self.north, self.south, self.east, self.west
        )
    }
}

/// Identity of a service area in the graph cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BBoxKey(String);

impl BBoxKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BBoxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;

    fn hendersonville() -> BBox {
        BBox::new(35.42, 35.28, -82.40, -82.55).unwrap()
    }

    #[test]
    fn rejects_degenerate_boxes() {
        assert!(BBox::new(35.28, 35.42, -82.40, -82.55).is_err());
        assert!(BBox::new(35.42, 35.28, -82.55, -82.40).is_err());
        assert!(BBox::new(f64::NAN, 35.28, -82.40, -82.55).is_err());
        assert!(BBox::new(91.0, 35.28, -82.40, -82.55).is_err());
    }

    #[test]
    fn key_rounds_to_five_decimals() {
        let bbox = BBox::new(35.420_000_1, 35.28, -82.4, -82.55).unwrap();
        assert_eq!(bbox.key().as_str(), "35.42000,35.28000,-82.40000,-82.55000");
        assert_eq!(bbox.key(), hendersonville().key());
    }

    #[test]
    fn centre_is_midpoint() {
        let centre = hendersonville().centre();
        assert_abs_diff_eq!(centre.lat, 35.35, epsilon = 1e-9);
        assert_abs_diff_eq!(centre.lon, -82.475, epsilon = 1e-9);
    }

    #[test]
    fn boundary_points_are_inside() {
        let bbox = hendersonville();
        assert!(bbox.contains(35.42, -82.40));
        assert!(bbox.contains(35.28, -82.55));
        assert!(bbox.contains(35.35, -82.47));
    }

    #[test]
    fn reports_violated_side() {
        let bbox = hendersonville();

        let north = bbox.check(36.42, -82.47).unwrap_err();
        assert_eq!(north.side, BoundSide::North);
        assert_relative_eq!(north.limit, 35.42);

        assert_eq!(bbox.check(35.0, -82.47).unwrap_err().side, BoundSide::South);
        assert_eq!(bbox.check(35.35, -82.0).unwrap_err().side, BoundSide::East);
        assert_eq!(bbox.check(35.35, -83.0).unwrap_err().side, BoundSide::West);
    }
}
