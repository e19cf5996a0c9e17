//! CART regression tree shared by the forest and boosting ensembles
//!
//! Splits minimize the summed squared error of the two children. Nodes are
//! stored in a flat vector and grown with an explicit work stack.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; all when `None`
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
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

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Pending {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Total squared-error decrease attributed to each feature
    importance: Vec<f64>,
}

const MIN_GAIN: f64 = 1e-12;

fn mean_of(y: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len() as f64
}

fn sse_of(y: &[f64], rows: &[usize]) -> f64 {
    let m = mean_of(y, rows);
    rows.iter().map(|&r| (y[r] - m).powi(2)).sum()
}

impl RegressionTree {
    /// Grow a tree on the given rows of `x`
    ///
    /// `y` is indexed by the same row numbers as `x`. Rows may repeat
    /// (bootstrap samples).
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[f64],
        rows: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = x.ncols();
        let mut tree = Self {
            nodes: vec![Node::Leaf {
                value: mean_of(y, &rows),
            }],
            importance: vec![0.0; n_features],
        };

        let mut stack = vec![Pending {
            node: 0,
            rows,
            depth: 0,
        }];

        while let Some(Pending { node, rows, depth }) = stack.pop() {
            if rows.len() < params.min_samples_split.max(2)
                || rows.len() < 2 * params.min_samples_leaf.max(1)
                || params.max_depth.is_some_and(|d| depth >= d)
            {
                continue;
            }

            let Some(split) = best_split(x, y, &rows, params, rng) else {
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&r| x[[r, split.feature]] <= split.threshold);

            tree.importance[split.feature] += split.gain;

            let left = tree.nodes.len();
            tree.nodes.push(Node::Leaf {
                value: mean_of(y, &left_rows),
            });
            tree.nodes.push(Node::Leaf {
                value: mean_of(y, &right_rows),
            });
            tree.nodes[node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right: left + 1,
            };

            stack.push(Pending {
                node: left,
                rows: left_rows,
                depth: depth + 1,
            });
            stack.push(Pending {
                node: left + 1,
                rows: right_rows,
                depth: depth + 1,
            });
        }

        tree
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
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

    /// Unnormalized impurity decrease per feature
    #[must_use]
    pub fn feature_importance(&self) -> &[f64] {
        &self.importance
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

fn best_split(
    x: ArrayView2<'_, f64>,
    y: &[f64],
    rows: &[usize],
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<BestSplit> {
    let n_features = x.ncols();
    let k = params.max_features.unwrap_or(n_features).clamp(1, n_features.max(1));
    let candidates: Vec<usize> = if k >= n_features {
        (0..n_features).collect()
    } else {
        index::sample(rng, n_features, k).into_vec()
    };

    let parent_sse = sse_of(y, rows);
    if parent_sse <= MIN_GAIN {
        return None;
    }

    let n = rows.len();
    let min_leaf = params.min_samples_leaf.max(1);
    let total_sum: f64 = rows.iter().map(|&r| y[r]).sum();
    let total_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();

    let mut best: Option<BestSplit> = None;
    let mut sorted = rows.to_vec();

    for feature in candidates {
        sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for i in 0..n - 1 {
            let r = sorted[i];
            left_sum += y[r];
            left_sq += y[r] * y[r];

            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let here = x[[r, feature]];
            let next = x[[sorted[i + 1], feature]];
            if here >= next {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let left_sse = left_sq - left_sum * left_sum / n_left as f64;
            let right_sse = right_sq - right_sum * right_sum / n_right as f64;
            let gain = parent_sse - (left_sse + right_sse);

            if gain > MIN_GAIN && best.is_none_or(|b| gain > b.gain) {
                best = Some(BestSplit {
                    feature,
                    threshold: here + (next - here) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};
    use rand::SeedableRng;

    #[test]
    fn test_tree_fits_step_function() {
        let x: Array2<f64> = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = [1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(x.view(), &y, (0..6).collect(), &TreeParams::default(), &mut rng);

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_row(array![2.5].view()), 1.0);
        assert_eq!(tree.predict_row(array![11.5].view()), 5.0);
        assert!(tree.feature_importance()[0] > 0.0);
    }

    #[test]
    fn test_depth_limit_and_constant_target() {
        let x: Array2<f64> = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let stump = TreeParams {
            max_depth: Some(1),
            ..TreeParams::default()
        };
        let tree = RegressionTree::fit(x.view(), &[1.0, 2.0, 3.0, 4.0], (0..4).collect(), &stump, &mut rng);
        assert_eq!(tree.n_leaves(), 2);

        let flat = RegressionTree::fit(x.view(), &[7.0; 4], (0..4).collect(), &TreeParams::default(), &mut rng);
        assert_eq!(flat.n_leaves(), 1);
        assert_eq!(flat.predict_row(array![100.0, 5.0].view()), 7.0);
    }
}
