use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::models::FeatureRow;

pub const SUPPORTED_MODEL_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported model version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("model feature schema mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("model has no trees")]
    EmptyForest,
    #[error("malformed tree {tree}: {reason}")]
    MalformedTree { tree: usize, reason: String },
}

/// The classifier's input contract. Field order here is the column order
/// the model was trained on; the model file must name the same columns in
/// the same order or loading fails.
#[derive(Debug, Clone, Copy)]
pub struct FeatureVector {
    pub attendance_pct: f64,
    pub max_consec_absences: f64,
    pub num_long_streaks: f64,
}

impl FeatureVector {
    pub const FEATURE_NAMES: [&'static str; 3] =
        ["attendance_pct", "max_consec_absences", "num_long_streaks"];

    pub fn values(&self) -> [f64; 3] {
        [
            self.attendance_pct,
            self.max_consec_absences,
            self.num_long_streaks,
        ]
    }
}

impl From<&FeatureRow> for FeatureVector {
    fn from(row: &FeatureRow) -> Self {
        FeatureVector {
            attendance_pct: row.attendance_pct,
            max_consec_absences: row.max_consec_absences as f64,
            num_long_streaks: row.num_long_streaks as f64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct ForestFile {
    model_version: u32,
    feature_names: Vec<String>,
    trees: Vec<Tree>,
}

/// A loaded decision-tree ensemble. Constructed once at process start and
/// read-only afterwards; safe to share across per-school runs.
#[derive(Debug)]
pub struct Forest {
    trees: Vec<Tree>,
}

impl Forest {
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ModelError> {
        let file: ForestFile = serde_json::from_str(raw)?;

        if file.model_version != SUPPORTED_MODEL_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: file.model_version,
                expected: SUPPORTED_MODEL_VERSION,
            });
        }

        if file.feature_names != FeatureVector::FEATURE_NAMES {
            return Err(ModelError::SchemaMismatch {
                expected: FeatureVector::FEATURE_NAMES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                found: file.feature_names,
            });
        }

        if file.trees.is_empty() {
            return Err(ModelError::EmptyForest);
        }

        for (i, tree) in file.trees.iter().enumerate() {
            validate_tree(i, tree)?;
        }

        Ok(Forest { trees: file.trees })
    }

    /// Estimated probability of the dropout-positive class: the mean of
    /// the per-tree leaf probabilities.
    pub fn predict_proba(&self, features: &FeatureVector) -> f64 {
        let values = features.values();
        let sum: f64 = self.trees.iter().map(|tree| walk(tree, &values)).sum();
        sum / self.trees.len() as f64
    }

    /// The classifier's own label. The decision boundary lives here and
    /// nowhere else in the pipeline.
    pub fn predict(&self, features: &FeatureVector) -> i32 {
        if self.predict_proba(features) >= 0.5 {
            1
        } else {
            0
        }
    }
}

fn validate_tree(index: usize, tree: &Tree) -> Result<(), ModelError> {
    let malformed = |reason: String| ModelError::MalformedTree {
        tree: index,
        reason,
    };

    if tree.nodes.is_empty() {
        return Err(malformed("tree has no nodes".to_string()));
    }

    for (i, node) in tree.nodes.iter().enumerate() {
        match node {
            Node::Leaf { leaf } => {
                if !(0.0..=1.0).contains(leaf) {
                    return Err(malformed(format!("leaf probability {leaf} out of range")));
                }
            }
            Node::Split {
                feature,
                left,
                right,
                ..
            } => {
                if *feature >= FeatureVector::FEATURE_NAMES.len() {
                    return Err(malformed(format!("feature index {feature} out of range")));
                }
                // Child links must point forward so a walk always
                // terminates at a leaf.
                for &child in [left, right] {
                    if child <= i || child >= tree.nodes.len() {
                        return Err(malformed(format!("bad child link {i} -> {child}")));
                    }
                }
            }
        }
    }

    Ok(())
}

fn walk(tree: &Tree, values: &[f64; 3]) -> f64 {
    let mut index = 0;
    loop {
        match &tree.nodes[index] {
            Node::Leaf { leaf } => return *leaf,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                index = if values[*feature] <= *threshold {
                    *left
                } else {
                    *right
                };
            }
        }
    }
}
