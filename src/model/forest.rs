//! Random forest classifier
//!
//! Trees use the array layout of scikit-learn's `tree_` object: node `i` is a
//! leaf when `children_left[i] == -1`, otherwise samples with
//! `x[feature[i]] <= threshold[i]` go left. `value[i]` holds the class
//! weights seen at that node during training.
//!
//! The forest probability is the mean of the per-tree class-1 probabilities,
//! which is what `RandomForestClassifier::predict_proba` computes.

use serde::{Deserialize, Serialize};

use super::record::{FEATURE_COUNT, FEATURE_NAMES};

const LEAF: i64 = -1;

/// Schema violations found while validating a deserialized forest
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForestError {
    #[error("feature names {found:?} do not match the expected {expected:?}")]
    FeatureNames {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("expected a binary classifier, found {0} classes")]
    NotBinary(usize),

    #[error("forest contains no trees")]
    Empty,

    #[error("tree {tree}: {message}")]
    Tree { tree: usize, message: String },
}

/// Serialized forest artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub feature_names: Vec<String>,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

/// A single tree in parallel-array form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
    /// Class-1 probability per node, derived from `value` during validation
    #[serde(skip)]
    positive_rate: Vec<f64>,
}

/// Where a sample goes at an internal node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Left(usize),
    Right(usize),
}

impl Split {
    pub fn node(self) -> usize {
        match self {
            Split::Left(n) | Split::Right(n) => n,
        }
    }
}

impl DecisionTree {
    #[cfg(test)]
    pub fn new(
        children_left: Vec<i64>,
        children_right: Vec<i64>,
        feature: Vec<i64>,
        threshold: Vec<f64>,
        value: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            children_left,
            children_right,
            feature,
            threshold,
            value,
            positive_rate: Vec::new(),
        }
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] == LEAF
    }

    /// Feature index tested at an internal node
    pub fn split_feature(&self, node: usize) -> usize {
        self.feature[node] as usize
    }

    /// Child reached by a feature value at an internal node
    pub fn route(&self, node: usize, value: f64) -> Split {
        if value <= self.threshold[node] {
            Split::Left(self.children_left[node] as usize)
        } else {
            Split::Right(self.children_right[node] as usize)
        }
    }

    /// Class-1 probability stored at a leaf
    pub fn leaf_value(&self, node: usize) -> f64 {
        self.positive_rate[node]
    }

    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node = 0;
        while !self.is_leaf(node) {
            node = self
                .route(node, features[self.split_feature(node)])
                .node();
        }
        self.leaf_value(node)
    }

    fn validate(&mut self) -> Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(format!(
                "array lengths differ (children_left={}, children_right={}, feature={}, threshold={}, value={})",
                n,
                self.children_right.len(),
                self.feature.len(),
                self.threshold.len(),
                self.value.len()
            ));
        }

        let mut rates = Vec::with_capacity(n);
        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            let is_leaf = left == LEAF;

            if is_leaf != (right == LEAF) {
                return Err(format!("node {node} has exactly one child"));
            }

            if !is_leaf {
                for child in [left, right] {
                    // Children always come after their parent, which also rules out cycles
                    if child <= node as i64 || child >= n as i64 {
                        return Err(format!("node {node} has invalid child index {child}"));
                    }
                }
                let feature = self.feature[node];
                if feature < 0 || feature as usize >= FEATURE_COUNT {
                    return Err(format!("node {node} splits on unknown feature {feature}"));
                }
                if !self.threshold[node].is_finite() {
                    return Err(format!("node {node} has a non-finite threshold"));
                }
            }

            let weights = &self.value[node];
            if weights.len() != 2 {
                return Err(format!(
                    "node {node} has {} class weights, expected 2",
                    weights.len()
                ));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(format!("node {node} has invalid class weights"));
            }
            let total = weights[0] + weights[1];
            if total > 0.0 {
                rates.push(weights[1] / total);
            } else if is_leaf {
                return Err(format!("leaf {node} has zero total weight"));
            } else {
                rates.push(0.0);
            }
        }

        self.positive_rate = rates;
        Ok(())
    }
}

impl RandomForest {
    /// Check the artifact against the clinical schema and precompute leaf probabilities
    pub fn validate(&mut self) -> Result<(), ForestError> {
        check_feature_names(&self.feature_names)?;

        if self.n_classes != 2 {
            return Err(ForestError::NotBinary(self.n_classes));
        }
        if self.trees.is_empty() {
            return Err(ForestError::Empty);
        }

        for (index, tree) in self.trees.iter_mut().enumerate() {
            tree.validate()
                .map_err(|message| ForestError::Tree { tree: index, message })?;
        }
        Ok(())
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        sum / self.trees.len() as f64
    }
}

/// Feature names in an artifact must match the record layout exactly
pub fn check_feature_names(found: &[String]) -> Result<(), ForestError> {
    let matches = found.len() == FEATURE_COUNT
        && found.iter().zip(FEATURE_NAMES.iter()).all(|(a, b)| a == b);

    if matches {
        Ok(())
    } else {
        Err(ForestError::FeatureNames {
            expected: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            found: found.to_vec(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    /// Stump on `feature`: left leaf `[l0, l1]`, right leaf `[r0, r1]`
    pub(crate) fn stump(feature: i64, threshold: f64, left: [f64; 2], right: [f64; 2]) -> DecisionTree {
        DecisionTree::new(
            vec![1, -1, -1],
            vec![2, -1, -1],
            vec![feature, -2, -2],
            vec![threshold, -2.0, -2.0],
            vec![
                vec![left[0] + right[0], left[1] + right[1]],
                left.to_vec(),
                right.to_vec(),
            ],
        )
    }

    /// Small asymmetric forest with interacting splits, used across test modules
    pub(crate) fn sample_forest() -> RandomForest {
        let deep = DecisionTree::new(
            //          0   1   2   3   4   5   6
            vec![1, 3, 5, -1, -1, -1, -1],
            vec![2, 4, 6, -1, -1, -1, -1],
            vec![6, 0, 2, -2, -2, -2, -2],
            vec![0.5, 6.0, 20.0, -2.0, -2.0, -2.0, -2.0],
            vec![
                vec![50.0, 50.0],
                vec![30.0, 10.0],
                vec![20.0, 40.0],
                vec![18.0, 2.0],
                vec![12.0, 8.0],
                vec![10.0, 10.0],
                vec![2.0, 30.0],
            ],
        );
        let repeated = DecisionTree::new(
            vec![1, 3, -1, -1, -1],
            vec![2, 4, -1, -1, -1],
            vec![3, 3, -2, -2, -2],
            vec![1.0, 0.25, -2.0, -2.0, -2.0],
            vec![
                vec![40.0, 20.0],
                vec![30.0, 10.0],
                vec![10.0, 10.0],
                vec![20.0, 2.0],
                vec![10.0, 8.0],
            ],
        );

        let mut forest = RandomForest {
            feature_names: names(),
            n_classes: 2,
            trees: vec![
                deep,
                repeated,
                stump(4, 0.5, [30.0, 10.0], [5.0, 15.0]),
                stump(5, 0.5, [25.0, 5.0], [4.0, 6.0]),
                stump(1, 0.5, [20.0, 20.0], [10.0, 30.0]),
            ],
        };
        forest.validate().unwrap();
        forest
    }

    #[test]
    fn test_stump_routing() {
        let mut forest = RandomForest {
            feature_names: names(),
            n_classes: 2,
            trees: vec![stump(6, 0.5, [3.0, 1.0], [1.0, 3.0])],
        };
        forest.validate().unwrap();

        let mut x = [0.0; FEATURE_COUNT];
        assert_eq!(forest.predict_proba(&x), 0.25);
        x[6] = 1.0;
        assert_eq!(forest.predict_proba(&x), 0.75);
        // Threshold itself goes left
        x[6] = 0.5;
        assert_eq!(forest.predict_proba(&x), 0.25);
    }

    #[test]
    fn test_forest_averages_trees() {
        let mut forest = RandomForest {
            feature_names: names(),
            n_classes: 2,
            trees: vec![
                stump(0, 10.0, [1.0, 0.0], [0.0, 1.0]),
                stump(0, 10.0, [1.0, 1.0], [1.0, 1.0]),
            ],
        };
        forest.validate().unwrap();

        let x = [5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(forest.predict_proba(&x), 0.25);
    }

    #[test]
    fn test_probability_bounds() {
        let forest = sample_forest();
        for age in [0.0, 3.0, 6.0, 12.0] {
            for cavity in [0.0, 1.0] {
                let x = [age, 1.0, 30.0, 0.1, 0.0, 1.0, cavity];
                let p = forest.predict_proba(&x);
                assert!((0.0..=1.0).contains(&p), "p = {p}");
            }
        }
    }

    #[test]
    fn test_rejects_wrong_feature_names() {
        let mut swapped = names();
        swapped.swap(0, 2);
        let mut forest = RandomForest {
            feature_names: swapped,
            n_classes: 2,
            trees: vec![stump(0, 1.0, [1.0, 0.0], [0.0, 1.0])],
        };
        assert!(matches!(
            forest.validate(),
            Err(ForestError::FeatureNames { .. })
        ));
    }

    #[test]
    fn test_rejects_non_binary() {
        let mut forest = RandomForest {
            feature_names: names(),
            n_classes: 1,
            trees: vec![stump(0, 1.0, [1.0, 0.0], [0.0, 1.0])],
        };
        assert_eq!(forest.validate(), Err(ForestError::NotBinary(1)));
    }

    #[test]
    fn test_rejects_bad_tree_shape() {
        let bad_feature = stump(9, 1.0, [1.0, 0.0], [0.0, 1.0]);
        let mut forest = RandomForest {
            feature_names: names(),
            n_classes: 2,
            trees: vec![bad_feature],
        };
        assert!(matches!(
            forest.validate(),
            Err(ForestError::Tree { tree: 0, .. })
        ));

        let backwards = DecisionTree::new(
            vec![0, -1, -1],
            vec![2, -1, -1],
            vec![0, -2, -2],
            vec![1.0, -2.0, -2.0],
            vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]],
        );
        forest.trees = vec![backwards];
        assert!(matches!(
            forest.validate(),
            Err(ForestError::Tree { tree: 0, .. })
        ));

        let empty_leaf = stump(0, 1.0, [0.0, 0.0], [0.0, 1.0]);
        forest.trees = vec![empty_leaf];
        assert!(matches!(
            forest.validate(),
            Err(ForestError::Tree { tree: 0, .. })
        ));
    }

    #[test]
    fn test_deserializes_artifact_layout() {
        let json = serde_json::json!({
            "feature_names": names(),
            "n_classes": 2,
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [6, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "value": [[10.0, 4.0], [9.0, 1.0], [1.0, 3.0]]
            }]
        });
        let mut forest: RandomForest = serde_json::from_value(json).unwrap();
        forest.validate().unwrap();
        assert_eq!(forest.tree_count(), 1);
        assert_eq!(forest.predict_proba(&[0.0; FEATURE_COUNT]), 0.1);
    }
}
