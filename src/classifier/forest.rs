//! Decision-Tree Ensemble
//!
//! Native evaluator for a random forest exported to JSON. Each split node
//! sends a sample left when `x[feature] <= threshold`; leaves carry per-class
//! weights. Tree outputs are normalized, averaged, and the arg-max class wins
//! (lowest index on ties).
//!
//! All structural checks happen once at load time so inference never has to
//! bounds-check or guard against cycles.

use super::ClassifierError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

/// Random-forest style ensemble of decision trees
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    n_features: usize,

    /// Class identifiers in leaf-vector order; defaults to `0..n_classes`
    #[serde(default)]
    classes: Vec<i64>,

    trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    /// Load and validate an ensemble from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {:?}", path))?;

        Self::from_json_str(&contents)
            .with_context(|| format!("Failed to load model: {:?}", path))
    }

    pub fn from_json_str(json: &str) -> Result<Self, ClassifierError> {
        let ensemble: TreeEnsemble = serde_json::from_str(json)
            .map_err(|e| ClassifierError::Malformed(format!("JSON parse error: {}", e)))?;
        ensemble.validated()
    }

    /// Check structure and fill in default class identifiers
    fn validated(mut self) -> Result<Self, ClassifierError> {
        if self.trees.is_empty() {
            return Err(ClassifierError::Malformed("ensemble has no trees".to_string()));
        }
        if self.n_features == 0 {
            return Err(ClassifierError::Malformed("n_features must be positive".to_string()));
        }

        let n_classes = self
            .trees
            .iter()
            .flat_map(|tree| tree.nodes.iter())
            .find_map(|node| match node {
                TreeNode::Leaf { value } => Some(value.len()),
                TreeNode::Split { .. } => None,
            })
            .ok_or_else(|| ClassifierError::Malformed("ensemble has no leaves".to_string()))?;

        if self.classes.is_empty() {
            self.classes = (0..n_classes as i64).collect();
        }
        if self.classes.len() != n_classes || n_classes == 0 {
            return Err(ClassifierError::Malformed(format!(
                "{} class identifiers for leaves of width {}",
                self.classes.len(),
                n_classes
            )));
        }

        for (tree_idx, tree) in self.trees.iter().enumerate() {
            validate_tree(tree, self.n_features, n_classes)
                .map_err(|msg| ClassifierError::Malformed(format!("tree {}: {}", tree_idx, msg)))?;
        }

        Ok(self)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Averaged class probabilities for one sample
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        if features.len() != self.n_features {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf_for(features);
            let sum: f64 = leaf.iter().sum();
            if sum > 0.0 {
                for (total, weight) in totals.iter_mut().zip(leaf) {
                    *total += weight / sum;
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        totals.iter_mut().for_each(|p| *p /= n_trees);
        Ok(totals)
    }

    /// Predicted class identifier for one sample
    pub fn predict_class(&self, features: &[f64]) -> Result<i64, ClassifierError> {
        let proba = self.predict_proba(features)?;

        let mut best = 0;
        for (idx, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = idx;
            }
        }
        Ok(self.classes[best])
    }
}

impl DecisionTree {
    fn leaf_for(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split { feature, threshold, left, right } => {
                    idx = if features[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

fn validate_tree(tree: &DecisionTree, n_features: usize, n_classes: usize) -> Result<(), String> {
    if tree.nodes.is_empty() {
        return Err("no nodes".to_string());
    }

    let n_nodes = tree.nodes.len();
    for (idx, node) in tree.nodes.iter().enumerate() {
        match node {
            TreeNode::Split { feature, threshold, left, right } => {
                if *feature >= n_features {
                    return Err(format!("node {} splits on feature {} of {}", idx, feature, n_features));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {} has a non-finite threshold", idx));
                }
                // Children after parent rules out cycles
                for child in [*left, *right] {
                    if child <= idx || child >= n_nodes {
                        return Err(format!("node {} has invalid child {}", idx, child));
                    }
                }
            }
            TreeNode::Leaf { value } => {
                if value.len() != n_classes {
                    return Err(format!(
                        "leaf {} has {} weights, expected {}",
                        idx,
                        value.len(),
                        n_classes
                    ));
                }
                if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(format!("leaf {} has invalid weights", idx));
                }
            }
        }
    }
    Ok(())
}
