use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use log::debug;
use super::{check_prediction_row, check_training_data, Regressor};
use crate::error::{StreamError, StreamResult};

/// Bagged ensemble of regression trees.
///
/// Every tree sees a bootstrap sample of the rows and considers all
/// features at each split. Per-tree seeds are drawn in order from one
/// seeded generator, so a given seed always yields the same forest no
/// matter how the trees are scheduled across threads.
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_trees: usize,
    seed: u64,
    min_samples_split: usize,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(n_trees: usize, seed: u64) -> Self {
        Self {
            n_trees,
            seed,
            min_samples_split: 2,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split.max(2);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> StreamResult<()> {
        self.n_features = check_training_data(x, y)?;
        if self.n_trees == 0 {
            return Err(StreamError::Fit("Forest needs at least one tree".to_string()));
        }

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.n_trees).map(|_| rng.gen()).collect();
        let min_split = self.min_samples_split;

        self.trees = tree_seeds
            .par_iter()
            .map(|&tree_seed| {
                let mut tree_rng = StdRng::seed_from_u64(tree_seed);
                let mut sample: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();
                DecisionTree::grow(x, y, &mut sample, min_split)
            })
            .collect();

        debug!(
            "Fitted forest of {} trees on {} rows x {} features (mean depth {:.1})",
            self.n_trees(),
            n,
            self.n_features,
            self.trees.iter().map(|t| t.depth() as f64).sum::<f64>() / self.trees.len() as f64
        );

        Ok(())
    }

    fn predict_one(&self, row: &[f64]) -> StreamResult<f64> {
        if self.trees.is_empty() {
            return Err(StreamError::Fit("Forest has not been fitted".to_string()));
        }
        check_prediction_row(row, self.n_features)?;

        let total: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        Ok(total / self.trees.len() as f64)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

/// CART regression tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl DecisionTree {
    /// Grows a tree on the rows listed in `sample` (indices may repeat).
    pub fn grow(x: &[Vec<f64>], y: &[f64], sample: &mut [usize], min_samples_split: usize) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow_node(x, y, sample, min_samples_split);
        tree
    }

    fn grow_node(&mut self, x: &[Vec<f64>], y: &[f64], sample: &mut [usize], min_samples_split: usize) -> usize {
        let node_idx = self.nodes.len();
        let value = sample.iter().map(|&i| y[i]).sum::<f64>() / sample.len() as f64;
        self.nodes.push(Node::Leaf { value });

        if sample.len() < min_samples_split || is_pure(y, sample) {
            return node_idx;
        }

        let Some(split) = best_split(x, y, sample) else {
            return node_idx;
        };

        let mid = partition(sample, |i| x[i][split.feature] <= split.threshold);
        let (left_sample, right_sample) = sample.split_at_mut(mid);

        let left = self.grow_node(x, y, left_sample, min_samples_split);
        let right = self.grow_node(x, y, right_sample, min_samples_split);

        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };

        node_idx
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                },
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }
}

fn is_pure(y: &[f64], sample: &[usize]) -> bool {
    let first = y[sample[0]];
    sample.iter().all(|&i| y[i] == first)
}

/// Variance-reduction split over every feature. Maximising
/// `sum_l^2 / n_l + sum_r^2 / n_r` is equivalent to minimising the summed
/// squared error of the two children.
fn best_split(x: &[Vec<f64>], y: &[f64], sample: &[usize]) -> Option<SplitCandidate> {
    let n = sample.len();
    let total: f64 = sample.iter().map(|&i| y[i]).sum();
    let n_features = x[sample[0]].len();

    let mut best: Option<SplitCandidate> = None;
    let mut order: Vec<usize> = sample.to_vec();

    for feature in 0..n_features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += y[order[k - 1]];

            let lo = x[order[k - 1]][feature];
            let hi = x[order[k]][feature];
            if lo >= hi {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / k as f64
                + right_sum * right_sum / (n - k) as f64;

            if best.as_ref().map_or(true, |b| score > b.score) {
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(SplitCandidate { feature, threshold, score });
            }
        }
    }

    best
}

/// In-place partition; returns the count of elements satisfying `pred`,
/// which end up at the front.
fn partition(sample: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..sample.len() {
        if pred(sample[i]) {
            sample.swap(mid, i);
            mid += 1;
        }
    }
    mid
}
