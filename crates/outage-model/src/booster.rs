//! Gradient-boosted tree ensemble loaded from an XGBoost JSON model.
//!
//! Only what a binary logistic `gbtree` model needs is supported: numeric
//! splits, missing-value default directions and a scalar base score.

use std::path::Path;

use serde::Deserialize;

use crate::error::PredictError;
use crate::features::FeatureVector;
use crate::predictor::Classifier;

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: LearnerJson,
}

#[derive(Debug, Deserialize)]
struct LearnerJson {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBoosterJson,
    learner_model_param: LearnerModelParamJson,
    objective: ObjectiveJson,
}

#[derive(Debug, Deserialize)]
struct GradientBoosterJson {
    name: String,
    #[serde(default)]
    model: Option<TreeModelJson>,
}

#[derive(Debug, Deserialize)]
struct TreeModelJson {
    trees: Vec<TreeJson>,
}

#[derive(Debug, Deserialize)]
struct TreeJson {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<i64>,
}

/// Older writers emit `default_left` as 0/1, newer ones as booleans.
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
struct LearnerModelParamJson {
    base_score: String,
    #[serde(default)]
    num_feature: Option<String>,
    #[serde(default)]
    num_class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectiveJson {
    name: String,
}

const LEAF: i64 = -1;

#[derive(Debug, Clone, Copy)]
struct Node {
    left: usize,
    right: usize,
    feature: usize,
    /// Split threshold for internal nodes, leaf value for leaves
    value: f32,
    default_left: bool,
    is_leaf: bool,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_json(index: usize, json: TreeJson, num_feature: usize) -> Result<Self, PredictError> {
        let invalid = |msg: String| PredictError::InvalidModel(format!("tree {}: {}", index, msg));

        let n = json.left_children.len();
        if n == 0 {
            return Err(invalid("no nodes".to_string()));
        }
        let lengths = [
            json.right_children.len(),
            json.split_indices.len(),
            json.split_conditions.len(),
            json.default_left.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(invalid(format!("node arrays differ in length ({} vs {:?})", n, lengths)));
        }
        if json.split_type.iter().any(|&t| t != 0) {
            return Err(invalid("categorical splits are not supported".to_string()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (json.left_children[i], json.right_children[i]);
            let node = if left == LEAF {
                Node {
                    left: 0,
                    right: 0,
                    feature: 0,
                    value: json.split_conditions[i] as f32,
                    default_left: false,
                    is_leaf: true,
                }
            } else {
                // children always follow their parent, so evaluation terminates
                let child = |c: i64| -> Result<usize, PredictError> {
                    usize::try_from(c)
                        .ok()
                        .filter(|&c| c > i && c < n)
                        .ok_or_else(|| invalid(format!("node {} has invalid child {}", i, c)))
                };
                let feature = usize::try_from(json.split_indices[i])
                    .ok()
                    .filter(|&f| f < num_feature)
                    .ok_or_else(|| {
                        invalid(format!(
                            "node {} splits on feature {} of {}",
                            i, json.split_indices[i], num_feature
                        ))
                    })?;
                Node {
                    left: child(left)?,
                    right: child(right)?,
                    feature,
                    value: json.split_conditions[i] as f32,
                    default_left: json.default_left[i].is_set(),
                    is_leaf: false,
                }
            };
            nodes.push(node);
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, features: &[f64]) -> f32 {
        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            if node.is_leaf {
                return node.value;
            }
            let x = features[node.feature];
            let go_left = if x.is_nan() {
                node.default_left
            } else {
                (x as f32) < node.value
            };
            idx = if go_left { node.left } else { node.right };
        }
    }
}

/// A loaded tree ensemble with a logistic output.
#[derive(Debug, Clone)]
pub struct Booster {
    trees: Vec<Tree>,
    feature_names: Vec<String>,
    num_feature: usize,
    base_margin: f64,
}

impl Booster {
    pub fn from_file(path: &Path) -> Result<Self, PredictError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PredictError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let booster = Self::from_json(&contents)?;
        tracing::info!(
            "Loaded model {} ({} trees, {} features)",
            path.display(),
            booster.num_trees(),
            booster.num_feature
        );
        Ok(booster)
    }

    pub fn from_json(json: &str) -> Result<Self, PredictError> {
        let file: ModelFile = serde_json::from_str(json)
            .map_err(|e| PredictError::InvalidModel(format!("not an XGBoost JSON model: {}", e)))?;
        let learner = file.learner;

        let objective = learner.objective.name.as_str();
        if objective != "binary:logistic" && objective != "reg:logistic" {
            return Err(PredictError::InvalidModel(format!(
                "unsupported objective '{}'",
                objective
            )));
        }
        if learner.gradient_booster.name != "gbtree" {
            return Err(PredictError::InvalidModel(format!(
                "unsupported booster '{}'",
                learner.gradient_booster.name
            )));
        }
        let params = learner.learner_model_param;
        if let Some(num_class) = params.num_class.as_deref() {
            if parse_number(num_class)? > 1.0 {
                return Err(PredictError::InvalidModel(format!(
                    "multi-class models are not supported (num_class {})",
                    num_class
                )));
            }
        }

        let num_feature = match params.num_feature.as_deref() {
            Some(raw) => parse_number(raw)? as usize,
            None => learner.feature_names.len(),
        };
        if !learner.feature_names.is_empty() && learner.feature_names.len() != num_feature {
            return Err(PredictError::InvalidModel(format!(
                "{} feature names for {} features",
                learner.feature_names.len(),
                num_feature
            )));
        }

        let base_score = parse_number(&params.base_score)?;
        if !(base_score > 0.0 && base_score < 1.0) {
            return Err(PredictError::InvalidModel(format!(
                "base_score {} is not a probability",
                base_score
            )));
        }

        let trees = learner
            .gradient_booster
            .model
            .ok_or_else(|| PredictError::InvalidModel("missing tree model".to_string()))?
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, tree)| Tree::from_json(i, tree, num_feature))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            feature_names: learner.feature_names,
            num_feature,
            base_margin: logit(base_score),
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_feature(&self) -> usize {
        self.num_feature
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Sum of leaf values plus the base margin, before the logistic link.
    pub fn margin(&self, vector: &FeatureVector) -> Result<f64, PredictError> {
        self.check_features(vector)?;
        let features = vector.values();
        Ok(self
            .trees
            .iter()
            .map(|tree| f64::from(tree.leaf_value(features)))
            .sum::<f64>()
            + self.base_margin)
    }

    fn check_features(&self, vector: &FeatureVector) -> Result<(), PredictError> {
        if vector.len() != self.num_feature {
            return Err(PredictError::FeatureMismatch(format!(
                "model expects {} features, got {}",
                self.num_feature,
                vector.len()
            )));
        }
        if !self.feature_names.is_empty() {
            if let Some((i, (want, got))) = self
                .feature_names
                .iter()
                .zip(vector.names())
                .enumerate()
                .find(|(_, (want, got))| want != got)
            {
                return Err(PredictError::FeatureMismatch(format!(
                    "feature {} is '{}' in the model but '{}' in the input",
                    i, want, got
                )));
            }
        }
        Ok(())
    }
}

impl Classifier for Booster {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        self.margin(features).map(sigmoid)
    }
}

/// Scalars are stored as strings such as `"5E-1"`, newer writers wrap them
/// in brackets: `"[5E-1]"`.
fn parse_number(raw: &str) -> Result<f64, PredictError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let first = trimmed.split(',').next().unwrap_or_default().trim();
    first
        .parse::<f64>()
        .map_err(|e| PredictError::InvalidModel(format!("invalid number '{}': {}", raw, e)))
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
