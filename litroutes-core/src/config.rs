//! Engine configuration, loadable from TOML.

use std::{path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Error, loading::DUKE_LIGHTS_URL, model::BBox, scoring::ScoringParams};

/// Default service area: Hendersonville, NC
pub const DEFAULT_BBOX: BBox = BBox {
    north: 35.42,
    south: 35.28,
    east: -82.40,
    west: -82.55,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Upper bound on the wait for all sources of one build
    pub timeout_secs: u64,
    /// Distance from an edge within which a light counts for it, meters
    pub light_buffer_m: f64,
    /// Fail the build when the light or land-use source fails
    pub require_auxiliary: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            light_buffer_m: 15.0,
            require_auxiliary: false,
        }
    }
}

impl LoaderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for persisted graphs; in-memory only when unset
    pub persist_dir: Option<PathBuf>,
}

/// Where build inputs come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// GeoJSON street network (`Point` nodes and `LineString` edges)
    pub streets: Option<PathBuf>,
    /// GeoJSON streetlight points
    pub lights: Option<PathBuf>,
    /// Streetlight HTTP endpoint, used when `lights` is unset; empty disables it
    pub lights_url: Option<String>,
    /// GeoJSON land-use polygons
    pub land_use: Option<PathBuf>,
    /// OSRM base URL for time-optimal routes
    pub osrm_url: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            streets: None,
            lights: None,
            lights_url: Some(DUKE_LIGHTS_URL.to_string()),
            land_use: None,
            osrm_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bbox: BBox,
    pub scoring: ScoringParams,
    pub loader: LoaderConfig,
    pub cache: CacheConfig,
    pub sources: SourcesConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bbox: DEFAULT_BBOX,
            scoring: ScoringParams::default(),
            loader: LoaderConfig::default(),
            cache: CacheConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or describes an unusable configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        self.bbox
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        self.scoring.validate().map_err(Error::Config)?;

        if self.loader.timeout_secs == 0 {
            return Err(Error::Config("loader timeout must be positive".into()));
        }
        if !self.loader.light_buffer_m.is_finite() || self.loader.light_buffer_m < 0.0 {
            return Err(Error::Config(
                "light buffer must be a non-negative distance".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.loader.timeout(), Duration::from_secs(120));
        assert_eq!(config.sources.lights_url.as_deref(), Some(DUKE_LIGHTS_URL));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [bbox]
            north = 36.0
            south = 35.0
            east = -82.0
            west = -83.0

            [scoring]
            light_bonus = 80.0

            [cache]
            persist_dir = "/var/cache/litroutes"

            [sources]
            streets = "data/streets.geojson"
            lights_url = "https://lights.example.com/api"
            "#,
        )
        .unwrap();

        assert_eq!(config.bbox.north, 36.0);
        assert_eq!(config.scoring.light_bonus, 80.0);
        assert_eq!(config.scoring.base_risk, 100.0);
        assert_eq!(
            config.cache.persist_dir,
            Some(PathBuf::from("/var/cache/litroutes"))
        );
        assert_eq!(
            config.sources.streets,
            Some(PathBuf::from("data/streets.geojson"))
        );
        assert_eq!(config.sources.land_use, None);
        assert_eq!(
            config.sources.lights_url.as_deref(),
            Some("https://lights.example.com/api")
        );
    }

    #[test]
    fn rejects_inverted_bbox() {
        let err = EngineConfig::from_toml_str(
            "[bbox]\nnorth = 35.0\nsouth = 36.0\neast = -82.0\nwest = -83.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = EngineConfig::from_toml_str("[loader]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
