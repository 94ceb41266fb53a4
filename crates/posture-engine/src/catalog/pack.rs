//! Versioned control packs on disk.
//!
//! A pack directory holds `manifest.json`, the controls file, and the
//! graph file. A manifest may lock the controls file to an xxh3 checksum;
//! editing a locked catalog in place is rejected.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use posture_core::config::GraphConfig;
use posture_core::errors::CatalogError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::graph::{ControlGraph, GraphDefinition};
use crate::taxonomy::{validate_and_build, ControlCatalog, DesignArea, RawCatalog};

pub const MANIFEST_FILE: &str = "manifest.json";
const DEFAULT_CONTROLS_FILE: &str = "controls.json";
const DEFAULT_GRAPH_FILE: &str = "graph.json";

fn default_controls_ref() -> String {
    DEFAULT_CONTROLS_FILE.to_string()
}

fn default_graph_ref() -> String {
    DEFAULT_GRAPH_FILE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackManifest {
    pub pack_id: String,
    #[serde(default)]
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_controls_ref")]
    pub controls_ref: String,
    #[serde(default = "default_graph_ref")]
    pub graph_ref: String,
    /// Hex xxh3-64 of the controls file, when the pack is frozen.
    #[serde(default)]
    pub locked_checksum: Option<String>,
}

/// A loaded, validated pack: catalog and graph built together.
#[derive(Debug, Clone)]
pub struct ControlPack {
    manifest: PackManifest,
    root: PathBuf,
    checksum: String,
    catalog: Arc<ControlCatalog>,
    graph: Arc<ControlGraph>,
}

impl ControlPack {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::load_with(dir, &GraphConfig::default())
    }

    pub fn load_with(dir: impl AsRef<Path>, config: &GraphConfig) -> Result<Self, CatalogError> {
        let root = dir.as_ref();
        if !root.is_dir() {
            return Err(CatalogError::PackNotFound {
                path: root.display().to_string(),
            });
        }

        let manifest: PackManifest = parse(&root.join(MANIFEST_FILE), &read(&root.join(MANIFEST_FILE))?)?;

        let controls_path = root.join(&manifest.controls_ref);
        let controls_bytes = read(&controls_path)?;
        let checksum = Self::checksum(&controls_bytes);
        if let Some(expected) = &manifest.locked_checksum {
            if !expected.eq_ignore_ascii_case(&checksum) {
                warn!(pack = %manifest.pack_id, %expected, actual = %checksum, "locked pack modified");
                return Err(CatalogError::VersionLocked {
                    pack: manifest.pack_id.clone(),
                    expected: expected.clone(),
                    actual: checksum,
                });
            }
        }

        let raw: RawCatalog = parse(&controls_path, &controls_bytes)?;
        let catalog = validate_and_build(&raw)?;

        let graph_path = root.join(&manifest.graph_ref);
        let definition: GraphDefinition = if graph_path.exists() {
            parse(&graph_path, &read(&graph_path)?)?
        } else {
            warn!(path = %graph_path.display(), "pack has no graph file, controls are independent");
            GraphDefinition::default()
        };
        let graph = ControlGraph::build(&catalog, definition, config)?;

        info!(
            pack = %manifest.pack_id,
            version = %manifest.version,
            controls = catalog.len(),
            "control pack loaded"
        );
        Ok(Self {
            manifest,
            root: root.to_path_buf(),
            checksum,
            catalog: Arc::new(catalog),
            graph: Arc::new(graph),
        })
    }

    /// Checksum format used by `locked_checksum`.
    pub fn checksum(bytes: &[u8]) -> String {
        format!("{:016x}", xxh3_64(bytes))
    }

    pub fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Checksum of the controls file as loaded.
    pub fn controls_checksum(&self) -> &str {
        &self.checksum
    }

    /// `pack_id@version`
    pub fn version_tag(&self) -> String {
        format!("{}@{}", self.manifest.pack_id, self.manifest.version)
    }

    pub fn control_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn controls_in_area(&self, area: DesignArea) -> &[String] {
        self.catalog.controls_in_area(area)
    }

    pub fn catalog(&self) -> &Arc<ControlCatalog> {
        &self.catalog
    }

    pub fn graph(&self) -> &Arc<ControlGraph> {
        &self.graph
    }
}

fn read(path: &Path) -> Result<Vec<u8>, CatalogError> {
    fs::read(path).map_err(|e| CatalogError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, CatalogError> {
    serde_json::from_slice(bytes).map_err(|e| CatalogError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
