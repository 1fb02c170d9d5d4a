//! Gradient-Boosted Tree Ensemble
//!
//! Reads the XGBoost JSON model format (`Booster.save_model("*.json")`) and
//! evaluates it natively. Only `gbtree` boosters with numerical splits are
//! supported, which is what the denial-risk training job produces.

use std::collections::HashMap;
use std::path::Path;

use ndarray::ArrayView2;
use serde::Deserialize;
use thiserror::Error;

use super::shap;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Failed to read model: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported booster: {0}")]
    UnsupportedBooster(String),

    #[error("Malformed tree {tree}: {reason}")]
    MalformedTree { tree: usize, reason: String },

    #[error("Invalid base_score: {0}")]
    InvalidBaseScore(String),

    #[error("Model not initialized")]
    NotInitialized,
}

// ============================================================================
// RAW JSON LAYOUT
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawModel {
    learner: RawLearner,
}

#[derive(Debug, Deserialize)]
struct RawLearner {
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: RawGradientBooster,
    learner_model_param: RawLearnerParam,
    objective: RawObjective,
}

#[derive(Debug, Deserialize)]
struct RawGradientBooster {
    name: String,
    model: Option<RawGbtreeModel>,
}

#[derive(Debug, Deserialize)]
struct RawGbtreeModel {
    trees: Vec<RawTree>,
}

/// `default_left` is written as 0/1 integers by recent releases and as
/// booleans by older ones.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    sum_hessian: Vec<f64>,
    #[serde(default)]
    loss_changes: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct RawLearnerParam {
    base_score: String,
    #[serde(default)]
    num_feature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawObjective {
    name: String,
}

// ============================================================================
// TREES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// `binary:logistic`, `reg:logistic`: sigmoid over the margin
    Logistic,
    /// `binary:logitraw`: margin is returned as is
    LogitRaw,
    /// Regression objectives
    Identity,
}

impl Objective {
    fn from_name(name: &str) -> Self {
        match name {
            "binary:logistic" | "reg:logistic" => Objective::Logistic,
            "binary:logitraw" => Objective::LogitRaw,
            _ => Objective::Identity,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub feature: usize,
    /// Split threshold for internal nodes, leaf value for leaves
    pub value: f32,
    pub default_left: bool,
    pub cover: f64,
    pub gain: f64,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.left.is_none()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Tree {
    pub nodes: Vec<Node>,
    /// Cover-weighted expected value of each node
    pub means: Vec<f64>,
}

impl Tree {
    fn from_raw(index: usize, raw: RawTree) -> Result<Self, ModelError> {
        let n = raw.left_children.len();
        let malformed = |reason: String| ModelError::MalformedTree { tree: index, reason };

        if n == 0 {
            return Err(malformed("no nodes".to_string()));
        }
        let lengths = [
            raw.right_children.len(),
            raw.split_indices.len(),
            raw.split_conditions.len(),
            raw.default_left.len(),
            raw.sum_hessian.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(malformed(format!("node arrays disagree in length ({} nodes)", n)));
        }

        let child = |c: i64| -> Result<Option<usize>, ModelError> {
            if c < 0 {
                Ok(None)
            } else if (c as usize) < n {
                Ok(Some(c as usize))
            } else {
                Err(malformed(format!("child index {} out of range", c)))
            }
        };

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = child(raw.left_children[i])?;
            let right = child(raw.right_children[i])?;
            if left.is_some() != right.is_some() {
                return Err(malformed(format!("node {} has a single child", i)));
            }
            nodes.push(Node {
                left,
                right,
                feature: raw.split_indices[i].max(0) as usize,
                value: raw.split_conditions[i],
                default_left: raw.default_left[i].is_set(),
                cover: raw.sum_hessian[i],
                gain: raw.loss_changes.get(i).copied().unwrap_or(0.0),
            });
        }

        let mut tree = Tree { nodes, means: vec![0.0; n] };
        tree.fill_means(0, 0)
            .map_err(|_| malformed("cycle detected".to_string()))?;
        Ok(tree)
    }

    fn fill_means(&mut self, idx: usize, depth: usize) -> Result<f64, ()> {
        // A well-formed tree never revisits a node, so depth cannot exceed the node count
        if depth > self.nodes.len() {
            return Err(());
        }
        let node = self.nodes[idx].clone();
        let mean = match (node.left, node.right) {
            (Some(l), Some(r)) => {
                let left_mean = self.fill_means(l, depth + 1)?;
                let right_mean = self.fill_means(r, depth + 1)?;
                let lc = self.nodes[l].cover;
                let rc = self.nodes[r].cover;
                if node.cover > 0.0 {
                    (lc * left_mean + rc * right_mean) / node.cover
                } else {
                    0.0
                }
            }
            _ => node.value as f64,
        };
        self.means[idx] = mean;
        Ok(mean)
    }

    /// Child taken by `x` at internal node `idx`
    pub fn next(&self, idx: usize, x: &[f32]) -> usize {
        let node = &self.nodes[idx];
        let v = x.get(node.feature).copied().unwrap_or(f32::NAN);
        let go_left = if v.is_nan() { node.default_left } else { v < node.value };
        match (go_left, node.left, node.right) {
            (true, Some(l), _) => l,
            (false, _, Some(r)) => r,
            _ => idx,
        }
    }

    pub fn leaf_value(&self, x: &[f32]) -> f64 {
        let mut idx = 0;
        while !self.nodes[idx].is_leaf() {
            idx = self.next(idx, x);
        }
        self.nodes[idx].value as f64
    }
}

// ============================================================================
// BOOSTER
// ============================================================================

/// Loaded gradient-boosted ensemble
#[derive(Debug, Clone)]
pub struct Booster {
    trees: Vec<Tree>,
    base_margin: f64,
    objective: Objective,
    feature_names: Vec<String>,
    num_feature: usize,
    best_iteration: Option<usize>,
    best_score: Option<f64>,
}

impl Booster {
    /// Load a booster from an XGBoost JSON checkpoint
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let booster = Self::from_json_str(&text)?;
        log::info!(
            "Loaded booster from {} ({} trees, {} features)",
            path.display(),
            booster.trees.len(),
            booster.num_feature
        );
        Ok(booster)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ModelError> {
        let raw: RawModel = serde_json::from_str(text)?;
        let learner = raw.learner;

        if learner.gradient_booster.name != "gbtree" {
            return Err(ModelError::UnsupportedBooster(learner.gradient_booster.name));
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| ModelError::UnsupportedBooster("gbtree without model".to_string()))?;

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| Tree::from_raw(i, t))
            .collect::<Result<Vec<_>, _>>()?;

        let objective = Objective::from_name(&learner.objective.name);
        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        let base_margin = match objective {
            Objective::Logistic => logit(base_score),
            _ => base_score,
        };

        let max_split = trees
            .iter()
            .flat_map(|t| t.nodes.iter().filter(|n| !n.is_leaf()).map(|n| n.feature + 1))
            .max()
            .unwrap_or(0);
        let declared = learner
            .learner_model_param
            .num_feature
            .as_deref()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let num_feature = declared.max(max_split).max(learner.feature_names.len());

        let best_iteration = learner
            .attributes
            .get("best_iteration")
            .and_then(|s| s.trim().parse().ok());
        let best_score = learner
            .attributes
            .get("best_score")
            .and_then(|s| s.trim().parse().ok());

        Ok(Self {
            trees,
            base_margin,
            objective,
            feature_names: learner.feature_names,
            num_feature,
            best_iteration,
            best_score,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_features(&self) -> usize {
        self.num_feature
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Feature names recorded at training time (empty when trained on a bare matrix)
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_score
    }

    pub fn base_margin(&self) -> f64 {
        self.base_margin
    }

    /// Trees used for a prediction limited to `iteration` (0-based, inclusive).
    /// An iteration past the last tree uses them all.
    fn active_trees(&self, iteration: Option<usize>) -> &[Tree] {
        match iteration {
            Some(it) => &self.trees[..it.saturating_add(1).min(self.trees.len())],
            None => &self.trees,
        }
    }

    /// Raw margin (log-odds for logistic objectives)
    pub fn predict_margin(&self, x: &[f32], iteration: Option<usize>) -> f64 {
        self.base_margin
            + self
                .active_trees(iteration)
                .iter()
                .map(|t| t.leaf_value(x))
                .sum::<f64>()
    }

    /// Transformed prediction: probability for logistic objectives
    pub fn predict(&self, x: &[f32], iteration: Option<usize>) -> f64 {
        let margin = self.predict_margin(x, iteration);
        match self.objective {
            Objective::Logistic => sigmoid(margin),
            _ => margin,
        }
    }

    /// Predict every row of a design matrix
    pub fn predict_batch(&self, x: ArrayView2<'_, f32>, iteration: Option<usize>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| match row.as_slice() {
                Some(slice) => self.predict(slice, iteration),
                None => self.predict(&row.to_vec(), iteration),
            })
            .collect()
    }

    /// Per-feature contributions to the margin (TreeSHAP).
    ///
    /// Returns `num_features + 1` values; the last one is the bias term.
    /// The values sum to `predict_margin(x, iteration)`.
    pub fn contributions(&self, x: &[f32], iteration: Option<usize>) -> Vec<f64> {
        let mut phi = vec![0.0; self.num_feature + 1];
        let bias = self.num_feature;
        phi[bias] = self.base_margin;
        for tree in self.active_trees(iteration) {
            phi[bias] += tree.means[0];
            shap::tree_shap(tree, x, &mut phi[..bias]);
        }
        phi
    }

    /// Gain importance: mean split gain per feature normalized to sum 1,
    /// sorted descending. Features never used for a split are omitted.
    pub fn feature_importance(&self) -> Vec<(String, f64)> {
        let mut totals: HashMap<usize, (f64, usize)> = HashMap::new();
        for tree in &self.trees {
            for node in tree.nodes.iter().filter(|n| !n.is_leaf()) {
                let entry = totals.entry(node.feature).or_insert((0.0, 0));
                entry.0 += node.gain;
                entry.1 += 1;
            }
        }

        let mut means: Vec<(usize, f64)> = totals
            .into_iter()
            .map(|(f, (gain, count))| (f, gain / count as f64))
            .collect();
        let sum: f64 = means.iter().map(|(_, g)| g).sum();
        if sum > 0.0 {
            for (_, g) in means.iter_mut() {
                *g /= sum;
            }
        }
        means.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        means
            .into_iter()
            .map(|(f, g)| (self.feature_name(f), g))
            .collect()
    }

    pub fn feature_name(&self, index: usize) -> String {
        self.feature_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("f{}", index))
    }
}

fn parse_base_score(raw: &str) -> Result<f64, ModelError> {
    // 2.x writes "5E-1", 3.x writes "[5E-1]"
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let first = trimmed.split(',').next().unwrap_or("").trim();
    first
        .parse::<f64>()
        .map_err(|_| ModelError::InvalidBaseScore(raw.to_string()))
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-16, 1.0 - 1e-16);
    (p / (1.0 - p)).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("fixtures/denial_model.json");

    fn booster() -> Booster {
        Booster::from_json_str(FIXTURE).unwrap()
    }

    #[test]
    fn test_load_fixture() {
        let b = booster();
        assert_eq!(b.num_trees(), 2);
        assert_eq!(b.num_features(), 3);
        assert_eq!(b.objective(), Objective::Logistic);
        assert_eq!(b.best_iteration(), Some(1));
        assert_eq!(b.best_score(), Some(0.91));
        assert!(b.base_margin().abs() < 1e-12);
    }

    #[test]
    fn test_predict_follows_splits() {
        let b = booster();

        // right at the root, left on days_since_update, right on num_licenses
        let margin = b.predict_margin(&[0.9, 2.0, 100.0], None);
        assert!((margin - (-0.5)).abs() < 1e-6);
        assert!((b.predict(&[0.9, 2.0, 100.0], None) - sigmoid(-0.5)).abs() < 1e-6);

        let margin = b.predict_margin(&[0.5, 0.0, 400.0], None);
        assert!((margin - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_missing_value_uses_default_direction() {
        let b = booster();
        // root defaults left (leaf 0.6), num_licenses defaults right (-0.1)
        let margin = b.predict_margin(&[f32::NAN, f32::NAN, f32::NAN], None);
        assert!((margin - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_iteration_limit() {
        let b = booster();
        let margin = b.predict_margin(&[0.9, 2.0, 100.0], Some(0));
        assert!((margin - (-0.4)).abs() < 1e-6);

        let all = b.predict_margin(&[0.9, 2.0, 100.0], None);
        assert_eq!(b.predict_margin(&[0.9, 2.0, 100.0], Some(usize::MAX)), all);
        assert_eq!(b.predict_margin(&[0.9, 2.0, 100.0], Some(7)), all);
    }

    #[test]
    fn test_feature_importance_normalized() {
        let b = booster();
        let importance = b.feature_importance();
        assert_eq!(importance[0].0, "data_completeness_score");
        let total: f64 = importance.iter().map(|(_, g)| g).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!((importance[0].1 - 12.5 / 19.5).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_dart_and_bad_trees() {
        let dart = FIXTURE.replace("\"name\": \"gbtree\"", "\"name\": \"dart\"");
        assert!(matches!(
            Booster::from_json_str(&dart),
            Err(ModelError::UnsupportedBooster(_))
        ));

        let broken = FIXTURE.replace("[1, -1, 3, -1, -1]", "[1, -1, 9, -1, -1]");
        assert!(matches!(
            Booster::from_json_str(&broken),
            Err(ModelError::MalformedTree { .. })
        ));
    }

    #[test]
    fn test_base_score_formats() {
        assert_eq!(parse_base_score("5E-1").unwrap(), 0.5);
        assert_eq!(parse_base_score("[2.5E-1]").unwrap(), 0.25);
        assert!(parse_base_score("abc").is_err());
    }
}
