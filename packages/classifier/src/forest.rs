//! Random forest of CART classification trees.
//!
//! Trees are grown on bootstrap samples with Gini impurity, midpoint
//! thresholds, and `sqrt(n_features)` candidate features per split. All
//! randomness flows from a single seeded [`StdRng`], so fitting the same data
//! with the same [`ForestConfig`] yields an identical forest.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Two feature values closer than this are treated as equal when placing
/// thresholds.
const FEATURE_EPSILON: f64 = 1e-7;

/// Random forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Maximum tree depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs to be considered for splitting.
    pub min_samples_split: usize,
    /// Seed for bootstrap and feature sampling.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single fitted CART tree stored as a node arena rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    /// Total impurity decrease per feature, normalized to sum to 1 (or all
    /// zeros for a single-leaf tree).
    importances: Vec<f64>,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            #[allow(clippy::cast_precision_loss)]
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn class_counts(samples: &[usize], y: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &s in samples {
        counts[y[s]] += 1;
    }
    counts
}

#[allow(clippy::cast_precision_loss)]
fn distribution(counts: &[usize], total: usize) -> Vec<f64> {
    if total == 0 {
        let n = counts.len().max(1) as f64;
        return vec![1.0 / n; counts.len()];
    }
    counts.iter().map(|&c| c as f64 / total as f64).collect()
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Weighted child impurity, `n_left * gini_left + n_right * gini_right`.
    child_impurity: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

struct Pending {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
}

/// Finds the best threshold on `feature`, or `None` if the feature is
/// constant over `samples`.
fn best_threshold(
    x: &[Vec<f64>],
    y: &[usize],
    samples: &[usize],
    feature: usize,
    parent_counts: &[usize],
) -> Option<(f64, f64)> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

    let first = x[*sorted.first()?][feature];
    let last = x[*sorted.last()?][feature];
    if last - first <= FEATURE_EPSILON {
        return None;
    }

    let n = sorted.len();
    let mut left_counts = vec![0; parent_counts.len()];
    let mut right_counts = parent_counts.to_vec();
    let mut best: Option<(f64, f64)> = None;

    for i in 0..n - 1 {
        let class = y[sorted[i]];
        left_counts[class] += 1;
        right_counts[class] -= 1;

        let here = x[sorted[i]][feature];
        let next = x[sorted[i + 1]][feature];
        if next - here <= FEATURE_EPSILON {
            continue;
        }

        let n_left = i + 1;
        let n_right = n - n_left;
        #[allow(clippy::cast_precision_loss)]
        let impurity = (n_left as f64).mul_add(
            gini(&left_counts, n_left),
            n_right as f64 * gini(&right_counts, n_right),
        );

        if best.is_none_or(|(_, b)| impurity < b) {
            best = Some((here.midpoint(next), impurity));
        }
    }

    best
}

impl DecisionTree {
    /// Grows a tree on `samples` (indices into `x`/`y`, duplicates allowed).
    fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        samples: Vec<usize>,
        n_classes: usize,
        n_features: usize,
        config: &ForestConfig,
        rng: &mut StdRng,
    ) -> Self {
        let max_features = max_features(n_features);
        let mut importances = vec![0.0; n_features];
        let mut nodes = vec![Node::Leaf {
            distribution: Vec::new(),
        }];
        let mut stack = vec![Pending {
            node: 0,
            samples,
            depth: 0,
        }];
        let mut feature_order: Vec<usize> = (0..n_features).collect();

        while let Some(Pending {
            node,
            samples,
            depth,
        }) = stack.pop()
        {
            let counts = class_counts(&samples, y, n_classes);
            let n = samples.len();
            let impurity = gini(&counts, n);

            let can_split = n >= config.min_samples_split
                && impurity > FEATURE_EPSILON
                && config.max_depth.is_none_or(|max| depth < max);

            let split = if can_split {
                feature_order.shuffle(rng);
                find_split(x, y, &samples, &feature_order, max_features, &counts)
            } else {
                None
            };

            let Some(split) = split else {
                nodes[node] = Node::Leaf {
                    distribution: distribution(&counts, n),
                };
                continue;
            };

            #[allow(clippy::cast_precision_loss)]
            let decrease = (n as f64).mul_add(impurity, -split.child_impurity);
            importances[split.feature] += decrease.max(0.0);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf {
                distribution: Vec::new(),
            });
            nodes.push(Node::Leaf {
                distribution: Vec::new(),
            });
            nodes[node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            stack.push(Pending {
                node: right,
                samples: split.right,
                depth: depth + 1,
            });
            stack.push(Pending {
                node: left,
                samples: split.left,
                depth: depth + 1,
            });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        Self { nodes, importances }
    }

    /// Class distribution of the leaf `row` falls into.
    fn leaf_distribution(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Evaluates features in `order` until `max_features` non-constant features
/// have been tried, returning the lowest-impurity split found.
fn find_split(
    x: &[Vec<f64>],
    y: &[usize],
    samples: &[usize],
    order: &[usize],
    max_features: usize,
    counts: &[usize],
) -> Option<BestSplit> {
    let mut tried = 0;
    let mut best: Option<(usize, f64, f64)> = None;

    for &feature in order {
        if tried >= max_features {
            break;
        }
        let Some((threshold, impurity)) = best_threshold(x, y, samples, feature, counts) else {
            continue;
        };
        tried += 1;
        if best.is_none_or(|(_, _, b)| impurity < b) {
            best = Some((feature, threshold, impurity));
        }
    }

    let (feature, threshold, child_impurity) = best?;
    let (left, right) = samples
        .iter()
        .partition(|&&s| x[s][feature] <= threshold);

    Some(BestSplit {
        feature,
        threshold,
        child_impurity,
        left,
        right,
    })
}

/// `floor(sqrt(n_features))`, at least 1.
#[must_use]
pub fn max_features(n_features: usize) -> usize {
    n_features.isqrt().max(1)
}

/// A fitted bagged ensemble of [`DecisionTree`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
    n_features: usize,
}

impl RandomForest {
    /// Fits the forest on dense rows `x` and class codes `y` (each in
    /// `0..n_classes`).
    #[must_use]
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, config: &ForestConfig) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        let n = x.len();
        let mut rng = StdRng::seed_from_u64(config.seed);

        let trees = (0..config.n_trees.max(1))
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.next_u64());
                let samples: Vec<usize> = if n == 0 {
                    Vec::new()
                } else {
                    (0..n).map(|_| tree_rng.gen_range(0..n)).collect()
                };
                DecisionTree::fit(x, y, samples, n_classes, n_features, config, &mut tree_rng)
            })
            .collect();

        Self {
            trees,
            n_classes,
            n_features,
        }
    }

    /// Number of classes the forest was fitted on.
    #[must_use]
    pub const fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of input features.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// The fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean of the trees' leaf distributions for `row`.
    #[must_use]
    pub fn predict_proba_row(&self, row: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in out.iter_mut().zip(tree.leaf_distribution(row)) {
                *acc += p;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let n_trees = self.trees.len() as f64;
        for p in &mut out {
            *p /= n_trees;
        }
        out
    }

    /// Most probable class for `row`; ties resolve to the lowest code.
    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba_row(row))
    }

    /// Mean decrease in impurity per feature: each tree's importances are
    /// normalized, averaged across trees that split at all, and the result
    /// renormalized to sum to 1.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut sum = vec![0.0; self.n_features];
        let mut contributing = 0_usize;
        for tree in &self.trees {
            if tree.importances.iter().sum::<f64>() <= 0.0 {
                continue;
            }
            contributing += 1;
            for (acc, imp) in sum.iter_mut().zip(&tree.importances) {
                *acc += imp;
            }
        }
        if contributing == 0 {
            return sum;
        }
        let total: f64 = sum.iter().sum();
        for imp in &mut sum {
            *imp /= total;
        }
        sum
    }
}

/// Index of the largest value; the first wins on ties.
#[must_use]
pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v > bv { (i, v) } else { (bi, bv) }
        })
        .0
}
