//! Depth-wise regression trees grown on gradient/hessian histograms.

use crate::model::binning::BinnedMatrix;
use crate::model::booster::BoostingParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Walks from the root; values `<= threshold` go left.
    pub(crate) fn predict(&self, row: &[f64]) -> f64 {
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
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub(crate) fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

struct BestSplit {
    feature: usize,
    bin: usize,
    gain: f64,
}

pub(crate) struct TreeGrower<'a> {
    binned: &'a BinnedMatrix,
    params: &'a BoostingParams,
    gradients: &'a [f64],
    hessians: &'a [f64],
    nodes: Vec<Node>,
}

impl<'a> TreeGrower<'a> {
    pub(crate) fn new(
        binned: &'a BinnedMatrix,
        params: &'a BoostingParams,
        gradients: &'a [f64],
        hessians: &'a [f64],
    ) -> Self {
        Self {
            binned,
            params,
            gradients,
            hessians,
            nodes: Vec::new(),
        }
    }

    /// Grows one tree over `rows`. Leaf values are already scaled by the learning rate.
    pub(crate) fn grow(mut self, rows: Vec<usize>) -> RegressionTree {
        self.build(rows, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: 0.0 });

        let (g, h) = self.sums(&rows);
        let split = if depth < self.params.max_depth && rows.len() > 1 {
            self.best_split(&rows, g, h)
        } else {
            None
        };

        let node = match split {
            Some(split) => {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .into_iter()
                    .partition(|row| self.binned.bin(split.feature, *row) <= split.bin);
                let left = self.build(left_rows, depth + 1);
                let right = self.build(right_rows, depth + 1);
                Node::Split {
                    feature: split.feature,
                    threshold: self.binned.threshold(split.feature, split.bin),
                    left,
                    right,
                }
            }
            None => Node::Leaf {
                value: -g / (h + self.params.lambda) * self.params.learning_rate,
            },
        };
        self.nodes[idx] = node;
        idx
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), row| {
            (g + self.gradients[*row], h + self.hessians[*row])
        })
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda)
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<BestSplit> {
        let parent = self.score(g, h);
        let mut best: Option<BestSplit> = None;

        for feature in 0..self.binned.n_features() {
            let n_bins = self.binned.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let mut histogram = vec![(0.0, 0.0); n_bins];
            for row in rows {
                let bucket = &mut histogram[self.binned.bin(feature, *row)];
                bucket.0 += self.gradients[*row];
                bucket.1 += self.hessians[*row];
            }

            let (mut g_left, mut h_left) = (0.0, 0.0);
            for (bin, (bin_g, bin_h)) in histogram.iter().enumerate().take(n_bins - 1) {
                g_left += bin_g;
                h_left += bin_h;
                let (g_right, h_right) = (g - g_left, h - h_left);
                if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight {
                    continue;
                }
                let gain = self.score(g_left, h_left) + self.score(g_right, h_right) - parent;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit { feature, bin, gain });
                }
            }
        }
        best
    }
}
