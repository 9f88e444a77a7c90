//! Random forest regressor for small tabular data.
//!
//! Each tree is a CART regression tree grown on a bootstrap resample of the
//! training set, splitting on the threshold that minimises squared error.
//! The forest predicts the mean of its trees.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use super::features::FEATURE_COUNT;

/// Row of feature values.
pub type Sample = [f64; FEATURE_COUNT];

/// Forest hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Unlimited when `None`.
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
            seed: Some(42),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, sample: &Sample) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Number of samples going left once sorted by `feature`.
    left_len: usize,
    score: f64,
}

/// A single regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    /// Grow a tree over the rows selected by `indices` (duplicates allowed).
    fn fit(
        samples: &[Sample],
        targets: &[f64],
        mut indices: Vec<usize>,
        params: &ForestParams,
        rng: &mut Mcg128Xsl64,
    ) -> Self {
        let root = Self::grow(samples, targets, &mut indices, 0, params, rng);
        Self { root }
    }

    fn grow(
        samples: &[Sample],
        targets: &[f64],
        indices: &mut [usize],
        depth: usize,
        params: &ForestParams,
        rng: &mut Mcg128Xsl64,
    ) -> Node {
        let mean = indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64;

        let min_leaf = params.min_samples_leaf.max(1);
        let depth_exhausted = params.max_depth.is_some_and(|max| depth >= max);
        let pure = indices.iter().all(|&i| (targets[i] - mean).abs() < f64::EPSILON);
        if depth_exhausted || pure || indices.len() < 2 * min_leaf {
            return Node::Leaf(mean);
        }

        let Some(split) = Self::best_split(samples, targets, indices, min_leaf, rng) else {
            return Node::Leaf(mean);
        };

        indices.sort_by(|&a, &b| samples[a][split.feature].total_cmp(&samples[b][split.feature]));
        let (left, right) = indices.split_at_mut(split.left_len);
        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(Self::grow(samples, targets, left, depth + 1, params, rng)),
            right: Box::new(Self::grow(samples, targets, right, depth + 1, params, rng)),
        }
    }

    /// Exhaustive search for the split with the lowest summed squared error.
    ///
    /// Maximising `sum_l^2 / n_l + sum_r^2 / n_r` is equivalent and avoids
    /// recomputing squares. Features are visited in random order so ties
    /// break differently across trees.
    fn best_split(
        samples: &[Sample],
        targets: &[f64],
        indices: &[usize],
        min_leaf: usize,
        rng: &mut Mcg128Xsl64,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let total: f64 = indices.iter().map(|&i| targets[i]).sum();
        let parent_score = total * total / n as f64;

        let mut features: Vec<usize> = (0..FEATURE_COUNT).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();
        for feature in features {
            order.sort_by(|&a, &b| samples[a][feature].total_cmp(&samples[b][feature]));

            let mut left_sum = 0.0;
            for left_len in 1..n {
                left_sum += targets[order[left_len - 1]];
                let lo = samples[order[left_len - 1]][feature];
                let hi = samples[order[left_len]][feature];
                if left_len < min_leaf || n - left_len < min_leaf || lo == hi {
                    continue;
                }

                let right_sum = total - left_sum;
                let score = left_sum * left_sum / left_len as f64
                    + right_sum * right_sum / (n - left_len) as f64;
                if score <= parent_score + 1e-9 {
                    continue;
                }
                if best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (lo + hi) / 2.0,
                        left_len,
                        score,
                    });
                }
            }
        }
        best
    }

    pub fn predict(&self, sample: &Sample) -> f64 {
        self.root.predict(sample)
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

/// Bagged ensemble of regression trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Fit on `samples`/`targets`. Returns `None` when there is nothing to fit.
    pub fn fit(samples: &[Sample], targets: &[f64], params: &ForestParams) -> Option<Self> {
        let n = samples.len();
        if n == 0 || n != targets.len() || params.n_trees == 0 {
            return None;
        }

        let mut rng = match params.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };

        let trees = (0..params.n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(samples, targets, bootstrap, params, &mut rng)
            })
            .collect();
        Some(Self { trees })
    }

    pub fn predict(&self, sample: &Sample) -> f64 {
        self.trees.iter().map(|t| t.predict(sample)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
