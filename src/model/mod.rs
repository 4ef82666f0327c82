//! Isolation-forest outlier model shared by both analysis pipelines.
//!
//! The forest repeatedly partitions the feature space with random
//! axis-aligned splits; points that end up alone after few splits are easier
//! to isolate and score as less normal. Scores are thresholded at the
//! contamination quantile of the fitted sample, so the configured fraction of
//! the data ends up labeled anomalous. All randomness comes from a seeded
//! `ChaCha20Rng`, so a fit is fully reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::config::ModelConfig;
use crate::pipeline::AnalysisError;

/// Subsample ceiling per tree, per the standard isolation-forest setup.
const MAX_SAMPLE_SIZE: usize = 256;

const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

/// Score and label for one scored record. `score` is monotonically higher =
/// more normal; `anomalous` is true when the score falls below the fitted
/// contamination threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyResult {
    pub index: usize,
    pub score: f64,
    pub anomalous: bool,
}

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        dim: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

pub struct IsolationForest {
    trees: Vec<Node>,
    /// Expected path length for the per-tree sample size, used to normalize
    /// raw path lengths.
    normalizer: f64,
    /// Contamination quantile of the training scores; scores strictly below
    /// it are anomalous.
    offset: f64,
}

impl IsolationForest {
    /// Fit the ensemble on `data` (one row per record, all rows the same
    /// width).
    ///
    /// Rules:
    /// - An empty sample is an `InsufficientData` error.
    /// - `contamination` must lie in (0, 0.5].
    /// - Same data + same config => identical trees, scores and labels.
    pub fn fit(cfg: &ModelConfig, data: &[Vec<f64>]) -> Result<Self, AnalysisError> {
        if data.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "cannot fit outlier model on an empty sample".to_string(),
            ));
        }
        if !(cfg.contamination > 0.0 && cfg.contamination <= 0.5) {
            return Err(AnalysisError::InvalidParameter(format!(
                "contamination must be in (0, 0.5], got {}",
                cfg.contamination
            )));
        }
        if cfg.trees == 0 {
            return Err(AnalysisError::InvalidParameter(
                "ensemble must have at least one tree".to_string(),
            ));
        }
        let width = data[0].len();
        if width == 0 || data.iter().any(|row| row.len() != width) {
            return Err(AnalysisError::InvalidParameter(
                "feature rows must be non-empty and uniform in width".to_string(),
            ));
        }

        let sample_size = data.len().min(MAX_SAMPLE_SIZE);
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;
        let mut rng = ChaCha20Rng::seed_from_u64(cfg.seed);

        let mut trees = Vec::with_capacity(cfg.trees);
        for _ in 0..cfg.trees {
            let rows: Vec<&[f64]> = if data.len() <= MAX_SAMPLE_SIZE {
                data.iter().map(Vec::as_slice).collect()
            } else {
                sample_indices(&mut rng, data.len(), sample_size)
                    .into_iter()
                    .map(|i| data[i].as_slice())
                    .collect()
            };
            trees.push(build_tree(rows, 0, max_depth, &mut rng));
        }

        let mut forest = Self {
            trees,
            normalizer: average_path_length(sample_size),
            offset: f64::NEG_INFINITY,
        };

        let mut train_scores: Vec<f64> = data.iter().map(|row| forest.score(row)).collect();
        train_scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        forest.offset = quantile(&train_scores, cfg.contamination);

        Ok(forest)
    }

    /// Continuous normality score for one row; higher = more normal. Always
    /// in [-1, 0].
    pub fn score(&self, row: &[f64]) -> f64 {
        // Degenerate single-point sample carries no isolation information.
        if self.normalizer <= 0.0 {
            return -0.5;
        }

        let mean_path = self
            .trees
            .iter()
            .map(|t| path_length(t, row, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        -(2.0_f64.powf(-mean_path / self.normalizer))
    }

    /// Whether a row falls in the anomalous fraction of the fitted sample.
    pub fn is_anomalous(&self, row: &[f64]) -> bool {
        self.score(row) < self.offset
    }

    /// Score and label every row of `data` in input order.
    pub fn results(&self, data: &[Vec<f64>]) -> Vec<AnomalyResult> {
        data.iter()
            .enumerate()
            .map(|(index, row)| {
                let score = self.score(row);
                AnomalyResult {
                    index,
                    score,
                    anomalous: score < self.offset,
                }
            })
            .collect()
    }
}

fn build_tree(rows: Vec<&[f64]>, depth: usize, max_depth: usize, rng: &mut ChaCha20Rng) -> Node {
    let n = rows.len();
    if n <= 1 || depth >= max_depth {
        return Node::Leaf { size: n };
    }

    // Only dimensions with spread can split; a set of identical points is
    // already a leaf.
    let width = rows[0].len();
    let splittable: Vec<(usize, f64, f64)> = (0..width)
        .filter_map(|dim| {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for row in &rows {
                lo = lo.min(row[dim]);
                hi = hi.max(row[dim]);
            }
            (hi > lo).then_some((dim, lo, hi))
        })
        .collect();
    if splittable.is_empty() {
        return Node::Leaf { size: n };
    }

    let (dim, lo, hi) = splittable[rng.gen_range(0..splittable.len())];
    let value = rng.gen_range(lo..hi);
    let (left, right): (Vec<&[f64]>, Vec<&[f64]>) = rows.into_iter().partition(|row| row[dim] < value);

    Node::Split {
        dim,
        value,
        left: Box::new(build_tree(left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, row: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            dim,
            value,
            left,
            right,
        } => {
            if row[*dim] < *value {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points, the
/// standard isolation-forest normalization term.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linearly interpolated quantile over an ascending-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// First `k` entries of a seeded partial Fisher-Yates shuffle of `0..n`.
fn sample_indices(rng: &mut ChaCha20Rng, n: usize, k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(contamination: f64, seed: u64) -> ModelConfig {
        ModelConfig { trees: 100, contamination, seed }
    }

    #[test]
    fn empty_sample_is_insufficient_data() {
        let res = IsolationForest::fit(&cfg(0.1, 0), &[]);
        assert!(matches!(res, Err(AnalysisError::InsufficientData(_))));
    }

    #[test]
    fn contamination_outside_range_is_rejected() {
        let data = vec![vec![1.0], vec![2.0]];
        assert!(matches!(
            IsolationForest::fit(&cfg(0.0, 0), &data),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            IsolationForest::fit(&cfg(0.7, 0), &data),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let data = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            IsolationForest::fit(&cfg(0.1, 0), &data),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn labeling_is_deterministic_for_a_fixed_seed() {
        let data: Vec<Vec<f64>> = (0..24)
            .map(|i| vec![(i % 12 + 1) as f64, 5.0 + 0.3 * (i % 7) as f64])
            .collect();

        let first = IsolationForest::fit(&cfg(0.1, 42), &data).unwrap();
        let second = IsolationForest::fit(&cfg(0.1, 42), &data).unwrap();

        let a = first.results(&data);
        let b = second.results(&data);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.index, y.index);
            assert_eq!(x.anomalous, y.anomalous);
            assert!((x.score - y.score).abs() < 1e-15);
        }
    }

    #[test]
    fn isolated_extreme_gets_the_lowest_score() {
        let data = vec![vec![-5.0], vec![-3.0], vec![-4.0], vec![-2.0], vec![40.0]];

        let forest = IsolationForest::fit(&cfg(0.2, 0), &data).unwrap();
        let results = forest.results(&data);

        let flagged: Vec<usize> = results.iter().filter(|r| r.anomalous).map(|r| r.index).collect();
        assert_eq!(flagged, vec![4]);
        let outlier_score = results[4].score;
        for r in &results[..4] {
            assert!(r.score > outlier_score);
        }
    }

    #[test]
    fn single_sample_fits_without_flagging_anything() {
        let data = vec![vec![3.0, 1.5]];
        let forest = IsolationForest::fit(&cfg(0.2, 0), &data).unwrap();
        let results = forest.results(&data);
        assert_eq!(results.len(), 1);
        assert!(!results[0].anomalous);
    }
}
