//! Model artifact: schema, validation, load and save
//!
//! The artifact is a single JSON document holding everything needed to
//! reproduce a forest's predictions:
//! - `features`: ordered feature names
//! - `classes`: ordered class labels
//! - `scaler`: per-feature `mean` / `scale`
//! - `encoders`: category lists for categorical features
//! - `forest`: flat tree arrays
//!
//! [`ArtifactDocument`] is the loosely checked wire form; [`ModelArtifact`]
//! is only ever constructed through full validation.

pub mod forest;
pub mod tree;

pub use forest::{argmax, Forest};
pub use tree::{normalize_counts, Tree, TreeDocument, TreeNode};

use crate::error::{RiskForestError, Result};
use crate::preprocessing::{CategoryEncoders, StandardScaler};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Wire form of the artifact, exactly as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDocument {
    pub features: Vec<String>,
    pub classes: Vec<String>,
    pub scaler: StandardScaler,
    #[serde(default)]
    pub encoders: CategoryEncoders,
    pub forest: Vec<TreeDocument>,
}

/// A fully validated, immutable model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    features: Vec<String>,
    classes: Vec<String>,
    scaler: StandardScaler,
    encoders: CategoryEncoders,
    forest: Forest,
}

impl TryFrom<ArtifactDocument> for ModelArtifact {
    type Error = RiskForestError;

    fn try_from(doc: ArtifactDocument) -> Result<Self> {
        let n_features = doc.features.len();
        let n_classes = doc.classes.len();

        if n_classes == 0 {
            return Err(RiskForestError::format("artifact declares no classes"));
        }

        let mut seen = HashSet::with_capacity(n_features);
        for name in &doc.features {
            if !seen.insert(name.as_str()) {
                warn!(feature = %name, "duplicate feature name in artifact");
            }
        }

        doc.scaler.validate(n_features)?;

        for (name, _) in doc.encoders.iter() {
            if !seen.contains(name.as_str()) {
                warn!(encoder = %name, "encoder does not match any feature and will be ignored");
            }
        }

        let trees = doc
            .forest
            .iter()
            .enumerate()
            .map(|(i, tree)| {
                Tree::from_document(tree, n_features, n_classes)
                    .map_err(|e| RiskForestError::format(format!("tree {}: {}", i, strip_prefix(&e))))
            })
            .collect::<Result<Vec<_>>>()?;
        let forest = Forest::new(trees, n_features, n_classes)?;

        Ok(Self {
            features: doc.features,
            classes: doc.classes,
            scaler: doc.scaler,
            encoders: doc.encoders,
            forest,
        })
    }
}

fn strip_prefix(err: &RiskForestError) -> String {
    match err {
        RiskForestError::FormatError(msg) => msg.clone(),
        other => other.to_string(),
    }
}

impl ModelArtifact {
    /// Assemble and validate an artifact from its parts
    pub fn new(
        features: Vec<String>,
        classes: Vec<String>,
        scaler: StandardScaler,
        encoders: CategoryEncoders,
        forest: Vec<TreeDocument>,
    ) -> Result<Self> {
        Self::try_from(ArtifactDocument {
            features,
            classes,
            scaler,
            encoders,
            forest,
        })
    }

    /// Load and validate an artifact file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RiskForestError::NotFound(path.to_path_buf()),
            _ => RiskForestError::IoError(e),
        })?;
        let doc: ArtifactDocument = serde_json::from_reader(BufReader::new(file))?;
        let artifact = Self::try_from(doc)?;
        info!(
            path = %path.display(),
            features = artifact.features.len(),
            classes = artifact.classes.len(),
            trees = artifact.forest.n_trees(),
            "model artifact loaded"
        );
        Ok(artifact)
    }

    /// Parse and validate an artifact held in memory
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: ArtifactDocument = serde_json::from_str(json)?;
        Self::try_from(doc)
    }

    /// Convert back to the wire form
    pub fn to_document(&self) -> ArtifactDocument {
        let n_classes = self.classes.len();
        ArtifactDocument {
            features: self.features.clone(),
            classes: self.classes.clone(),
            scaler: self.scaler.clone(),
            encoders: self.encoders.clone(),
            forest: self
                .forest
                .trees()
                .iter()
                .map(|t| t.to_document(n_classes))
                .collect(),
        }
    }

    /// Write the artifact atomically: nothing appears at `path` unless the
    /// whole document was written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json_atomic(path.as_ref(), &self.to_document())
    }

    /// Structural overview for diagnostics
    pub fn summary(&self) -> ArtifactSummary {
        let trees = self.forest.trees();
        ArtifactSummary {
            features: self.features.clone(),
            classes: self.classes.clone(),
            categorical_features: self.encoders.iter().map(|(k, v)| (k.clone(), v.len())).collect(),
            n_trees: trees.len(),
            total_nodes: trees.iter().map(Tree::n_nodes).sum(),
            total_leaves: trees.iter().map(Tree::n_leaves).sum(),
            max_depth: trees.iter().map(Tree::max_depth).max().unwrap_or(0),
        }
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn encoders(&self) -> &CategoryEncoders {
        &self.encoders
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }
}

/// Diagnostic overview of a loaded artifact
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub features: Vec<String>,
    pub classes: Vec<String>,
    /// Categorical feature name → number of known categories
    pub categorical_features: Vec<(String, usize)>,
    pub n_trees: usize,
    pub total_nodes: usize,
    pub total_leaves: usize,
    pub max_depth: usize,
}

/// Serialize `value` as JSON into a temporary file next to `path`, then rename it into place
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, value)
            .map_err(|e| RiskForestError::SerializationError(e.to_string()))?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
