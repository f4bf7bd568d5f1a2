//! Isolation forest anomaly scorer.
//!
//! Fitted once at startup over the embedded bootstrap corpus. Scores follow
//! the usual decision-function convention: `-(2^(-E[h(x)] / c(ψ))) - offset`,
//! where `offset` is the contamination percentile of the training scores, so
//! negative values are outliers.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::domain::{AnomalyLabel, AnomalyScore};
use crate::engine::AnomalyScorer;
use crate::error::{ShieldError, ShieldResult};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Fitting parameters.
#[derive(Debug, Clone)]
pub struct IsolationForestParams {
    pub estimators: usize,
    pub max_samples: usize,
    /// Expected outlier share of the corpus, in (0, 0.5].
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            estimators: 100,
            max_samples: 256,
            contamination: 0.15,
            seed: 42,
        }
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn path_length(&self, x: &[f64], depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if x[*feature] < *threshold {
                    left.path_length(x, depth + 1)
                } else {
                    right.path_length(x, depth + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile, `q` in [0, 100].
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

struct TreeBuilder<'a> {
    corpus: &'a [Vec<f64>],
    dimension: usize,
    height_limit: usize,
}

impl TreeBuilder<'_> {
    fn build(&self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> Node {
        if depth >= self.height_limit || indices.len() <= 1 {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        // Only features that still vary can split this node.
        let candidates: Vec<(usize, f64, f64)> = (0..self.dimension)
            .filter_map(|feature| {
                let (min, max) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(min, max), &i| {
                        let v = self.corpus[i][feature];
                        (min.min(v), max.max(v))
                    },
                );
                (max > min).then_some((feature, min, max))
            })
            .collect();

        if candidates.is_empty() {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        let (feature, min, max) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.corpus[i][feature] < threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(left, depth + 1, rng)),
            right: Box::new(self.build(right, depth + 1, rng)),
        }
    }
}

/// A fitted, read-only isolation forest.
#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<Node>,
    dimension: usize,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    /// Fit a forest over `corpus`. All vectors must share one length.
    pub fn fit(corpus: &[Vec<f64>], params: &IsolationForestParams) -> ShieldResult<Self> {
        let dimension = match corpus.first() {
            Some(first) if !first.is_empty() => first.len(),
            Some(_) => return Err(ShieldError::Config("anomaly corpus vectors are empty".into())),
            None => return Err(ShieldError::Config("anomaly corpus is empty".into())),
        };
        if let Some(bad) = corpus.iter().position(|v| v.len() != dimension) {
            return Err(ShieldError::Config(format!(
                "anomaly corpus vector {} has length {}, expected {}",
                bad,
                corpus[bad].len(),
                dimension
            )));
        }
        if params.estimators == 0 {
            return Err(ShieldError::Config("models.estimators must be positive".into()));
        }
        if !(params.contamination > 0.0 && params.contamination <= 0.5) {
            return Err(ShieldError::Config(format!(
                "models.contamination must be within (0, 0.5], got {}",
                params.contamination
            )));
        }

        let sample_size = params.max_samples.clamp(1, corpus.len());
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;
        let builder = TreeBuilder {
            corpus,
            dimension,
            height_limit,
        };

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.estimators)
            .map(|_| {
                let indices = index::sample(&mut rng, corpus.len(), sample_size).into_vec();
                builder.build(indices, 0, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            dimension,
            sample_size,
            offset: 0.0,
        };
        let training_scores: Vec<f64> = corpus.iter().map(|x| forest.raw_score(x)).collect();
        forest.offset = percentile(&training_scores, 100.0 * params.contamination);

        tracing::info!(
            samples = corpus.len(),
            trees = forest.trees.len(),
            sample_size,
            offset = forest.offset,
            "Isolation forest fitted"
        );

        Ok(forest)
    }

    /// Unshifted score in [-1, 0); lower is more anomalous.
    fn raw_score(&self, x: &[f64]) -> f64 {
        let mean_depth = self
            .trees
            .iter()
            .map(|tree| tree.path_length(x, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        let normalizer = average_path_length(self.sample_size);
        let exponent = if normalizer > 0.0 {
            mean_depth / normalizer
        } else {
            1.0
        };
        -(2f64.powf(-exponent))
    }
}

impl AnomalyScorer for IsolationForest {
    fn score(&self, vector: &[f64]) -> ShieldResult<AnomalyScore> {
        if vector.len() != self.dimension {
            return Err(ShieldError::collaborator(
                "anomaly scorer",
                format!(
                    "vector has length {}, forest was fitted on {}",
                    vector.len(),
                    self.dimension
                ),
            ));
        }

        let score = self.raw_score(vector) - self.offset;
        let label = if score < 0.0 {
            AnomalyLabel::Anomalous
        } else {
            AnomalyLabel::Normal
        };
        Ok(AnomalyScore { score, label })
    }
}
