//! Durable graph snapshots keyed by bounding box and input fingerprint.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use log::{debug, info};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    Error, SafetyGraph,
    model::{BBox, BBoxKey, LatLon, StreetEdge, StreetNode},
};

/// Version of the persisted graph layout; bump on any change to the model
pub const SCHEMA_VERSION: u32 = 1;

/// Stable hash of the build inputs
pub fn fingerprint(parts: &[&str]) -> String {
    let joined = parts.join("\u{1f}");
    format!("{:016x}", xxh3_64(joined.as_bytes()))
}

/// Serializable form of a [`SafetyGraph`]; edges keep their index order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub bbox: BBox,
    pub nodes: Vec<StreetNode>,
    pub edges: Vec<StreetEdge>,
    pub lights: Vec<LatLon>,
}

impl GraphSnapshot {
    pub fn from_graph(graph: &SafetyGraph) -> Self {
        Self {
            bbox: *graph.bbox(),
            nodes: graph.nodes().cloned().collect(),
            edges: graph.edges().cloned().collect(),
            lights: graph.lights().to_vec(),
        }
    }

    /// Rebuild the graph; node and edge indices match the snapshotted graph.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge references a node missing from the snapshot.
    pub fn into_graph(self) -> Result<SafetyGraph, Error> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut indices = HashMap::with_capacity(self.nodes.len());
        for node in self.nodes {
            let id = node.id;
            indices.insert(id, graph.add_node(node));
        }
        for edge in self.edges {
            let (Some(&from), Some(&to)) = (indices.get(&edge.from), indices.get(&edge.to)) else {
                return Err(Error::Persistence(format!(
                    "edge {} -> {} references an unknown node",
                    edge.from, edge.to
                )));
            };
            graph.add_edge(from, to, edge);
        }
        Ok(SafetyGraph::new(self.bbox, graph, self.lights, false))
    }
}

/// On-disk cache record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedGraph {
    pub bbox_key: BBoxKey,
    pub fingerprint: String,
    pub schema_version: u32,
    pub built_at: DateTime<Utc>,
    pub graph: GraphSnapshot,
}

/// Directory of persisted graphs, one JSON file per bounding box
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &BBoxKey) -> PathBuf {
        self.dir
            .join(format!("graph_{}.json", key.as_str().replace(',', "_")))
    }

    /// Load the graph stored for `key` if it was built from the same inputs.
    ///
    /// Returns `Ok(None)` when nothing is stored or the stored record has a
    /// different fingerprint or schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read.
    pub fn load(
        &self,
        key: &BBoxKey,
        fingerprint: &str,
    ) -> Result<Option<(SafetyGraph, DateTime<Utc>)>, Error> {
        let path = self.path_for(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: PersistedGraph = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Persistence(format!("{}: {e}", path.display())))?;

        if record.schema_version != SCHEMA_VERSION
            || record.fingerprint != fingerprint
            || &record.bbox_key != key
        {
            info!(
                "Stored graph {} is stale (fingerprint {} v{}, expected {fingerprint} v{SCHEMA_VERSION}); rebuilding",
                path.display(),
                record.fingerprint,
                record.schema_version
            );
            return Ok(None);
        }

        let graph = record.graph.into_graph()?;
        debug!(
            "Restored graph for {key} from {} ({} nodes, {} edges)",
            path.display(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Some((graph, record.built_at)))
    }

    /// Write the graph atomically: a temporary file is renamed over the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(
        &self,
        key: &BBoxKey,
        fingerprint: &str,
        graph: &SafetyGraph,
        built_at: DateTime<Utc>,
    ) -> Result<PathBuf, Error> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let record = PersistedGraph {
            bbox_key: key.clone(),
            fingerprint: fingerprint.to_string(),
            schema_version: SCHEMA_VERSION,
            built_at,
            graph: GraphSnapshot::from_graph(graph),
        };

        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, &record)
            .map_err(|e| Error::Persistence(e.to_string()))?;
        writer.flush()?;
        drop(writer);
        std::fs::rename(&tmp, &path)?;

        debug!("Persisted graph for {key} to {}", path.display());
        Ok(path)
    }

    /// Delete the record for `key`; a missing record is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove(&self, key: &BBoxKey) -> Result<bool, Error> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
