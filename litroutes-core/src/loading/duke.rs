//! Streetlight inventory served by the Duke Energy lighting API.

use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;

use super::{raw_types::StreetLight, sources::DataSource};
use crate::{DataSourceError, model::BBox, model::LatLon};

pub const DUKE_LIGHTS_URL: &str = "https://salor-api.duke-energy.app/streetlights";

/// HTTP streetlight source queried by south-west / north-east corners
#[derive(Debug, Clone)]
pub struct DukeLightSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl DukeLightSource {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DataSourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataSourceError::unreachable("duke_lights", e))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl DataSource for DukeLightSource {
    type Output = Vec<StreetLight>;

    fn name(&self) -> &str {
        "duke_lights"
    }

    fn revision(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self, bbox: &BBox) -> Result<Vec<StreetLight>, DataSourceError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("swLat", bbox.south),
                ("swLong", bbox.west),
                ("neLat", bbox.north),
                ("neLong", bbox.east),
            ])
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| DataSourceError::unreachable(self.name(), e))?;

        let body: Value = response
            .json()
            .map_err(|e| DataSourceError::malformed(self.name(), e))?;

        let lights: Vec<StreetLight> = parse_lights(&body)
            .into_iter()
            .filter(|light| bbox.contains(light.lat, light.lon))
            .collect();
        debug!("Duke API returned {} lights inside {bbox}", lights.len());
        Ok(lights)
    }
}

/// Extract light positions from the loosely structured API answer.
///
/// Accepts a bare array or one wrapped in `data` / `results`, whose items are
/// objects with `latitude`/`longitude` or `lat`/`lng`|`lon` keys (any case) or
/// two-element coordinate arrays. Unusable items are skipped.
pub fn parse_lights(body: &Value) -> Vec<StreetLight> {
    let items: &[Value] = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(envelope) => match envelope.get("data").or_else(|| envelope.get("results")) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    let lights: Vec<StreetLight> = items.iter().filter_map(parse_item).collect();
    if lights.len() < items.len() {
        warn!(
            "Skipped {} of {} streetlight records without usable coordinates",
            items.len() - lights.len(),
            items.len()
        );
    }
    lights
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn parse_item(item: &Value) -> Option<StreetLight> {
    match item {
        Value::Object(fields) => {
            let get = |key: &str| {
                fields
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .and_then(|(_, v)| number(v))
            };
            if let (Some(lat), Some(lon)) = (get("latitude"), get("longitude")) {
                return Some(LatLon::new(lat, lon));
            }
            let lat = get("lat")?;
            let lon = get("lng").or_else(|| get("lon"))?;
            Some(LatLon::new(lat, lon))
        }
        Value::Array(pair) if pair.len() >= 2 => {
            let (a, b) = (number(&pair[0])?, number(&pair[1])?);
            let is_lat = |v: f64| (-90.0..=90.0).contains(&v);
            let is_lon = |v: f64| (-180.0..=180.0).contains(&v);
            if is_lat(a) && is_lon(b) {
                Some(LatLon::new(a, b))
            } else if is_lat(b) && is_lon(a) {
                Some(LatLon::new(b, a))
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_objects_in_any_case() {
        let body = json!([
            {"Latitude": 35.35, "Longitude": -82.47},
            {"lat": "35.36", "lng": -82.46},
            {"LAT": 35.37, "lon": -82.45},
            {"name": "no coordinates"}
        ]);
        let lights = parse_lights(&body);
        assert_eq!(
            lights,
            [
                LatLon::new(35.35, -82.47),
                LatLon::new(35.36, -82.46),
                LatLon::new(35.37, -82.45)
            ]
        );
    }

    #[test]
    fn unwraps_envelopes_and_pairs() {
        // lat-first wins whenever the first value is a valid latitude
        let body = json!({"data": [
            [35.35, -82.47],
            [-120.0, 35.36],
            [-82.46, 35.36],
            [200.0, 300.0]
        ]});
        assert_eq!(
            parse_lights(&body),
            [
                LatLon::new(35.35, -82.47),
                LatLon::new(35.36, -120.0),
                LatLon::new(-82.46, 35.36)
            ]
        );

        let body = json!({"results": [{"latitude": 1.0, "longitude": 2.0}]});
        assert_eq!(parse_lights(&body), [LatLon::new(1.0, 2.0)]);
    }

    #[test]
    fn unexpected_shapes_yield_nothing() {
        assert!(parse_lights(&json!("nope")).is_empty());
        assert!(parse_lights(&json!({"data": {"lat": 1.0}})).is_empty());
    }
}
