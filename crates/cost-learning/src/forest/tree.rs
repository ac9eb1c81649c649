//! Regression tree (CART) grown by exact greedy search.
//!
//! Splits minimise the summed squared error of the two children. Candidate
//! thresholds are midpoints between consecutive distinct feature values;
//! rows with `x[feature] <= threshold` go left. Among equally good splits the
//! first feature and lowest threshold examined win.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// One node of a fitted tree, stored in a flat vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split.
    pub max_features: usize,
}

/// A fitted regression tree. The root is `nodes[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Predict one row. The row must have at least as many values as the
    /// highest feature index used by the tree.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Check that the node graph is a well-formed tree over `n_features`.
    pub fn verify(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let mut referenced = vec![false; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} has a non-finite value", i));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} uses feature {} of {}",
                            i, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", i));
                    }
                    // Children always follow their parent.
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() || referenced[child] {
                            return Err(format!("node {} has an invalid child {}", i, child));
                        }
                        referenced[child] = true;
                    }
                }
            }
        }
        Ok(())
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Reduction in summed squared error.
    gain: f64,
}

/// Grows one tree over `samples` (indices into `x`/`y`, repeats allowed).
pub(crate) struct TreeGrower<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: TreeParams,
    n_features: usize,
    nodes: Vec<Node>,
    /// Summed squared-error reduction per feature.
    importances: Vec<f64>,
}

impl<'a> TreeGrower<'a> {
    pub fn new(x: &'a [Vec<f64>], y: &'a [f64], n_features: usize, params: TreeParams) -> Self {
        Self {
            x,
            y,
            params,
            n_features,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        }
    }

    /// Grow the tree. Returns it with its per-feature impurity decrease.
    pub fn grow(mut self, samples: &[usize], rng: &mut StdRng) -> (RegressionTree, Vec<f64>) {
        self.build_node(samples, 0, rng);
        (RegressionTree { nodes: self.nodes }, self.importances)
    }

    fn build_node(&mut self, samples: &[usize], depth: usize, rng: &mut StdRng) -> usize {
        let current = self.nodes.len();
        let (sum, sum_sq) = samples.iter().fold((0.0, 0.0), |(s, sq), &i| {
            let y = self.y[i];
            (s + y, sq + y * y)
        });
        let n = samples.len() as f64;
        let mean = sum / n;
        let sse = (sum_sq - sum * sum / n).max(0.0);

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        let pure = samples.iter().all(|&i| self.y[i] == self.y[samples[0]]);

        if depth_reached
            || pure
            || samples.len() < self.params.min_samples_split
            || samples.len() < 2 * self.params.min_samples_leaf
        {
            self.nodes.push(Node::Leaf { value: mean });
            return current;
        }

        let Some(split) = self.find_best_split(samples, sum, rng) else {
            self.nodes.push(Node::Leaf { value: mean });
            return current;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&i| self.x[i][split.feature] <= split.threshold);

        self.importances[split.feature] += split.gain.min(sse);

        // Placeholder, patched once both children exist.
        self.nodes.push(Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: 0,
            right: 0,
        });

        let left_idx = self.build_node(&left, depth + 1, rng);
        let right_idx = self.build_node(&right, depth + 1, rng);

        if let Node::Split { left, right, .. } = &mut self.nodes[current] {
            *left = left_idx;
            *right = right_idx;
        }
        current
    }

    fn candidate_features(&self, rng: &mut StdRng) -> Vec<usize> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        if self.params.max_features < self.n_features {
            features.shuffle(rng);
            features.truncate(self.params.max_features);
            features.sort_unstable();
        }
        features
    }

    fn find_best_split(&self, samples: &[usize], total_sum: f64, rng: &mut StdRng) -> Option<BestSplit> {
        let n = samples.len();
        let min_leaf = self.params.min_samples_leaf;
        let parent_score = total_sum * total_sum / n as f64;
        let mut best: Option<BestSplit> = None;

        for feature in self.candidate_features(rng) {
            let mut order: Vec<(f64, f64)> = samples
                .iter()
                .map(|&i| (self.x[i][feature], self.y[i]))
                .collect();
            order.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += order[pos].1;
                let n_left = pos + 1;
                let n_right = n - n_left;

                let (current, next) = (order[pos].0, order[pos + 1].0);
                if current == next || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let score = left_sum * left_sum / n_left as f64
                    + right_sum * right_sum / n_right as f64;
                let gain = score - parent_score;

                if best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: midpoint(current, next),
                        gain,
                    });
                }
            }
        }

        best.filter(|b| b.gain > 0.0)
    }
}

/// Midpoint of two adjacent distinct values that still separates them.
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid >= high || !mid.is_finite() { low } else { mid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params() -> TreeParams {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 1,
        }
    }

    fn grow(x: &[Vec<f64>], y: &[f64], params: TreeParams) -> (RegressionTree, Vec<f64>) {
        let samples: Vec<usize> = (0..y.len()).collect();
        let n_features = x[0].len();
        let mut rng = StdRng::seed_from_u64(0);
        TreeGrower::new(x, y, n_features, params).grow(&samples, &mut rng)
    }

    #[test]
    fn test_step_function_is_learned_exactly() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0], vec![10.0], vec![11.0], vec![12.0]];
        let y = vec![5.0, 5.0, 5.0, 20.0, 20.0, 20.0];
        let (tree, importances) = grow(&x, &y, params());

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(
            tree.nodes()[0],
            Node::Split {
                feature: 0,
                threshold: 6.5,
                left: 1,
                right: 2
            }
        );
        assert_eq!(tree.predict(&[0.0]), 5.0);
        assert_eq!(tree.predict(&[6.5]), 5.0);
        assert_eq!(tree.predict(&[7.0]), 20.0);
        assert!(importances[0] > 0.0);
        assert!(tree.verify(1).is_ok());
    }

    #[test]
    fn test_constant_target_gives_single_leaf() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![4.0, 4.0, 4.0];
        let (tree, _) = grow(&x, &y, params());
        assert_eq!(tree.nodes(), &[Node::Leaf { value: 4.0 }]);
    }

    #[test]
    fn test_constant_feature_cannot_split() {
        let x = vec![vec![1.0], vec![1.0], vec![1.0]];
        let y = vec![1.0, 2.0, 3.0];
        let (tree, _) = grow(&x, &y, params());
        assert_eq!(tree.nodes(), &[Node::Leaf { value: 2.0 }]);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..16).map(|i| (i * i) as f64).collect();
        let limited = TreeParams {
            max_depth: Some(2),
            ..params()
        };
        let (tree, _) = grow(&x, &y, limited);
        assert!(tree.depth() <= 2);
        assert!(tree.n_leaves() <= 4);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let p = TreeParams {
            min_samples_leaf: 5,
            ..params()
        };
        let (tree, _) = grow(&x, &y, p);
        // Only the 5/5 split is allowed.
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict(&[0.0]), 2.0);
        assert_eq!(tree.predict(&[9.0]), 7.0);
    }

    #[test]
    fn test_verify_rejects_bad_feature_index() {
        let tree = RegressionTree {
            nodes: vec![
                Node::Split {
                    feature: 3,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: 0.0 },
                Node::Leaf { value: 1.0 },
            ],
        };
        assert!(tree.verify(2).is_err());
        assert!(tree.verify(4).is_ok());
    }

    #[test]
    fn test_verify_rejects_cycles() {
        let tree = RegressionTree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 0,
                    right: 1,
                },
                Node::Leaf { value: 1.0 },
            ],
        };
        assert!(tree.verify(1).is_err());
    }
}
