//! Isolation Forest Evaluator
//!
//! Walks serialized isolation trees. A point that is isolated after few
//! splits (short average path) is anomalous.
//!
//! Scores follow the usual convention of the fitting library:
//! `score_samples` lies in `[-1, 0)` and lower means more anomalous;
//! `decision_function = score_samples - offset` is negative for outliers.

use serde::{Deserialize, Serialize};

use super::inference::ModelError;
use super::FEATURE_COUNT;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// One node of an isolation tree. Node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        samples: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Sub-sample size each tree was grown on
    pub max_samples: usize,
    /// Decision offset fitted from the contamination rate
    pub offset: f64,
    pub trees: Vec<IsolationTree>,
}

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

impl IsolationTree {
    fn validate(&self, index: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid(format!("tree {} has no nodes", index)));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { feature, threshold, left, right } = node {
                if *feature >= FEATURE_COUNT {
                    return Err(ModelError::Invalid(format!(
                        "tree {} node {} splits on unknown feature {}",
                        index, i, feature
                    )));
                }
                if !threshold.is_finite() {
                    return Err(ModelError::Invalid(format!(
                        "tree {} node {} has non-finite threshold",
                        index, i
                    )));
                }
                // children must come after their parent, so every walk terminates
                for child in [*left, *right] {
                    if child <= i || child >= self.nodes.len() {
                        return Err(ModelError::Invalid(format!(
                            "tree {} node {} has invalid child index {}",
                            index, i, child
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Depth of the leaf reached by `x`, adjusted for the leaf's sample count
    pub fn path_length(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut index = 0;
        let mut depth = 0usize;

        loop {
            match &self.nodes[index] {
                TreeNode::Split { feature, threshold, left, right } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                    depth += 1;
                }
                TreeNode::Leaf { samples } => {
                    return depth as f64 + average_path_length(*samples);
                }
            }
        }
    }
}

impl IsolationForest {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".to_string()));
        }
        if self.max_samples < 2 {
            return Err(ModelError::Invalid(format!(
                "max_samples must be at least 2, got {}",
                self.max_samples
            )));
        }
        if !self.offset.is_finite() {
            return Err(ModelError::Invalid("forest offset must be finite".to_string()));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }

        Ok(())
    }

    /// Raw anomaly score. Lower = more anomalous.
    pub fn score_samples(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(x)).sum();
        let mean_depth = total / self.trees.len() as f64;

        -(2f64).powf(-mean_depth / average_path_length(self.max_samples))
    }

    /// Shifts a raw score by the fitted offset. Negative for outliers.
    pub fn decision_function(&self, raw_score: f64) -> f64 {
        raw_score - self.offset
    }
}
