//! Interventional TreeSHAP
//!
//! For a foreground sample `x` and a background sample `z`, every tree defines
//! the coalition game `v(S) = tree(x_S, z_rest)`. The Shapley values of that
//! game are computed exactly by walking the tree once:
//!
//! - where `x` and `z` take the same branch, the split does not depend on
//!   the coalition and the walk just follows it;
//! - where they disagree, the split feature becomes a player. The walk
//!   branches, once with the feature taken from `x` and once from `z`, and
//!   remembers that choice for later splits on the same feature.
//!
//! A leaf reached with `a` features taken from `x` and `b` taken from `z`
//! contributes `leaf * (a-1)! b! / (a+b)!` to each `x` feature and
//! `-leaf * a! (b-1)! / (a+b)!` to each `z` feature. Averaging over
//! background rows and trees gives values satisfying
//! `E[f(z)] + sum(phi) == f(x)`.

use crate::model::{BackgroundData, BackgroundError, DecisionTree, RandomForest, FEATURE_COUNT};

/// Source of a feature value on the current tree path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Unassigned,
    Foreground,
    Background,
}

/// Explains forest predictions against a fixed reference sample
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    background: Vec<[f64; FEATURE_COUNT]>,
    expected_value: f64,
}

impl TreeExplainer {
    /// Sample the background and precompute the expected model output
    pub fn new(
        forest: &RandomForest,
        background: &BackgroundData,
        max_samples: usize,
    ) -> Result<Self, BackgroundError> {
        let background = background.sample(max_samples)?;
        let expected_value = background
            .iter()
            .map(|row| forest.predict_proba(row))
            .sum::<f64>()
            / background.len().max(1) as f64;

        tracing::debug!(
            background_rows = background.len(),
            expected_value,
            "Built tree explainer"
        );

        Ok(Self {
            background,
            expected_value,
        })
    }

    /// Mean positive-class probability over the reference sample
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    pub fn background_rows(&self) -> usize {
        self.background.len()
    }

    /// Per-feature SHAP values of the positive-class probability for `x`
    pub fn shap_values(
        &self,
        forest: &RandomForest,
        x: &[f64; FEATURE_COUNT],
    ) -> [f64; FEATURE_COUNT] {
        let weights = ShapleyWeights::new();
        let mut phi = [0.0; FEATURE_COUNT];

        for tree in &forest.trees {
            for z in &self.background {
                let mut origins = [Origin::Unassigned; FEATURE_COUNT];
                walk(tree, 0, x, z, &mut origins, 0, 0, &weights, &mut phi);
            }
        }

        let scale = (forest.trees.len() * self.background.len()) as f64;
        if scale > 0.0 {
            for value in phi.iter_mut() {
                *value /= scale;
            }
        }
        phi
    }
}

#[allow(clippy::too_many_arguments)]
fn walk(
    tree: &DecisionTree,
    node: usize,
    x: &[f64; FEATURE_COUNT],
    z: &[f64; FEATURE_COUNT],
    origins: &mut [Origin; FEATURE_COUNT],
    from_x: usize,
    from_z: usize,
    weights: &ShapleyWeights,
    phi: &mut [f64; FEATURE_COUNT],
) {
    if tree.is_leaf(node) {
        if from_x + from_z == 0 {
            return;
        }
        let value = tree.leaf_value(node);
        for (feature, origin) in origins.iter().enumerate() {
            match origin {
                Origin::Foreground => phi[feature] += value * weights.gain(from_x, from_z),
                Origin::Background => phi[feature] -= value * weights.loss(from_x, from_z),
                Origin::Unassigned => {}
            }
        }
        return;
    }

    let feature = tree.split_feature(node);
    let x_child = tree.route(node, x[feature]).node();
    let z_child = tree.route(node, z[feature]).node();

    if x_child == z_child {
        walk(tree, x_child, x, z, origins, from_x, from_z, weights, phi);
        return;
    }

    let origin = origins[feature];
    match origin {
        Origin::Foreground => walk(tree, x_child, x, z, origins, from_x, from_z, weights, phi),
        Origin::Background => walk(tree, z_child, x, z, origins, from_x, from_z, weights, phi),
        Origin::Unassigned => {
            origins[feature] = Origin::Foreground;
            walk(tree, x_child, x, z, origins, from_x + 1, from_z, weights, phi);
            origins[feature] = Origin::Background;
            walk(tree, z_child, x, z, origins, from_x, from_z + 1, weights, phi);
            origins[feature] = Origin::Unassigned;
        }
    }
}

/// Factorial table for coalition weights over at most `FEATURE_COUNT` players
struct ShapleyWeights {
    factorial: [f64; FEATURE_COUNT + 1],
}

impl ShapleyWeights {
    fn new() -> Self {
        let mut factorial = [1.0; FEATURE_COUNT + 1];
        for n in 1..=FEATURE_COUNT {
            factorial[n] = factorial[n - 1] * n as f64;
        }
        Self { factorial }
    }

    /// Weight for a feature taken from the foreground, `a >= 1`
    fn gain(&self, a: usize, b: usize) -> f64 {
        self.factorial[a - 1] * self.factorial[b] / self.factorial[a + b]
    }

    /// Weight for a feature taken from the background, `b >= 1`
    fn loss(&self, a: usize, b: usize) -> f64 {
        self.factorial[a] * self.factorial[b - 1] / self.factorial[a + b]
    }
}
