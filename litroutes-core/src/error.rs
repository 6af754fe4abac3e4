use std::{fmt, sync::Arc, time::Duration};

use thiserror::Error;

use crate::{NodeId, routing::Criterion};

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    OutOfBounds(#[from] OutOfBoundsError),
    #[error(transparent)]
    NoPath(#[from] NoPathError),
    #[error("No graph nodes available for snapping")]
    NoPointsFound,
    #[error("Invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("Unknown node id {0}")]
    UnknownNode(NodeId),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
    #[error("Graph persistence error: {0}")]
    Persistence(String),
    #[error("I/O error: {0}")]
    IoError(Arc<std::io::Error>),
    #[error("Unrecoverable error: {0}")]
    UnrecoverableError(&'static str),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(Arc::new(err))
    }
}

/// Failure of an external street, light or land-use source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataSourceError {
    #[error("{source_name} source is unreachable: {reason}")]
    Unreachable { source_name: String, reason: String },
    #[error("{source_name} source did not answer within {timeout:?}")]
    Timeout {
        source_name: String,
        timeout: Duration,
    },
    #[error("{source_name} source returned malformed data: {reason}")]
    Malformed { source_name: String, reason: String },
    #[error("{source_name} source returned no usable data for bbox {bbox_key}")]
    Empty {
        source_name: String,
        bbox_key: String,
    },
}

impl DataSourceError {
    pub fn unreachable(source_name: &str, reason: impl fmt::Display) -> Self {
        DataSourceError::Unreachable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(source_name: &str, reason: impl fmt::Display) -> Self {
        DataSourceError::Malformed {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn source_name(&self) -> &str {
        match self {
            DataSourceError::Unreachable { source_name, .. }
            | DataSourceError::Timeout { source_name, .. }
            | DataSourceError::Malformed { source_name, .. }
            | DataSourceError::Empty { source_name, .. } => source_name,
        }
    }
}

/// Side of the service area a coordinate fell outside of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundSide {
    North,
    South,
    East,
    West,
}

impl fmt::Display for BoundSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoundSide::North => "north",
            BoundSide::South => "south",
            BoundSide::East => "east",
            BoundSide::West => "west",
        };
        f.write_str(name)
    }
}

/// Role of a coordinate within a route request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Start,
    End,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Start => f.write_str("start"),
            Endpoint::End => f.write_str("end"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub struct OutOfBoundsError {
    pub lat: f64,
    pub lon: f64,
    /// First violated side, checked in north, south, east, west order
    pub side: BoundSide,
    /// Value of the violated bound in decimal degrees
    pub limit: f64,
    pub endpoint: Option<Endpoint>,
}

impl OutOfBoundsError {
    /// Tag the error with the request endpoint it belongs to
    #[must_use]
    pub fn at(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

impl fmt::Display for OutOfBoundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.endpoint {
            Some(endpoint) => write!(f, "{endpoint} point")?,
            None => f.write_str("point")?,
        }
        let relation = match self.side {
            BoundSide::North => "north of",
            BoundSide::South => "south of",
            BoundSide::East => "east of",
            BoundSide::West => "west of",
        };
        write!(
            f,
            " ({}, {}) lies {relation} the service area {} bound {}",
            self.lat, self.lon, self.side, self.limit
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub struct NoPathError {
    pub from: NodeId,
    pub to: NodeId,
    pub criterion: Criterion,
}

impl fmt::Display for NoPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No {} route from node {} to node {}",
            self.criterion, self.from, self.to
        )
    }
}
