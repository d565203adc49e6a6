//! Random Forest - bagged CART trees with Gini impurity
//!
//! - Bootstrap sampling per tree (optional)
//! - Per-split feature subsampling; the search continues past constant
//!   features until `max_features` informative ones were examined
//! - Probability = mean of leaf positive rates, label = probability > 0.5
//!
//! Trees are stored as flat node arenas so the whole forest serializes
//! into the model artifact.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_RANDOM_STATE;

use super::{Classifier, ModelError};

// ============================================================================
// PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split; `None` means sqrt(n_features)
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(10),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: DEFAULT_RANDOM_STATE,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_trees == 0 {
            return Err(ModelError::InvalidParams("n_trees must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidParams("min_samples_split must be at least 2".into()));
        }
        if self.min_samples_leaf == 0 {
            return Err(ModelError::InvalidParams("min_samples_leaf must be at least 1".into()));
        }
        if self.max_features == Some(0) {
            return Err(ModelError::InvalidParams("max_features must be at least 1".into()));
        }
        Ok(())
    }

    fn features_per_split(&self, n_features: usize) -> usize {
        let default = (n_features as f64).sqrt().round() as usize;
        self.max_features.unwrap_or(default).clamp(1, n_features)
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        probability: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { probability, .. } => return *probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Best split found for one node
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [u8],
    params: &'a ForestParams,
    features_per_split: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, samples: Vec<usize>) -> DecisionTree {
        self.grow(samples, 0);
        DecisionTree { nodes: self.nodes }
    }

    fn leaf(&mut self, samples: &[usize], positives: usize) -> usize {
        self.nodes.push(Node::Leaf {
            probability: positives as f64 / samples.len().max(1) as f64,
            samples: samples.len(),
        });
        self.nodes.len() - 1
    }

    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let positives = samples.iter().filter(|&&i| self.y[i] == 1).count();

        let stop = samples.len() < self.params.min_samples_split
            || self.params.max_depth.is_some_and(|max| depth >= max)
            || positives == 0
            || positives == samples.len();
        if stop {
            return self.leaf(&samples, positives);
        }

        let Some(split) = self.best_split(&samples) else {
            return self.leaf(&samples, positives);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.x[[i, split.feature]] <= split.threshold);

        // Reserve the split slot before children so the root stays at 0
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            probability: 0.0,
            samples: 0,
        });

        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn best_split(&mut self, samples: &[usize]) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<SplitCandidate> = None;
        let mut informative = 0;

        for feature in features {
            if informative >= self.features_per_split {
                break;
            }

            let mut sorted: Vec<(f64, u8)> = samples
                .iter()
                .map(|&i| (self.x[[i, feature]], self.y[i]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
                continue;
            };
            if first.0 == last.0 {
                continue;
            }
            informative += 1;

            if let Some(candidate) = self.best_threshold(feature, &sorted) {
                if best.as_ref().map_or(true, |b| candidate.impurity < b.impurity) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Sweep the sorted column, scoring each boundary between distinct values
    fn best_threshold(&self, feature: usize, sorted: &[(f64, u8)]) -> Option<SplitCandidate> {
        let total = sorted.len();
        let total_pos = sorted.iter().filter(|(_, y)| *y == 1).count();
        let min_leaf = self.params.min_samples_leaf;

        let mut left_pos = 0;
        let mut best: Option<SplitCandidate> = None;

        for k in 1..total {
            left_pos += usize::from(sorted[k - 1].1 == 1);

            let (lo, hi) = (sorted[k - 1].0, sorted[k].0);
            if lo == hi || k < min_leaf || total - k < min_leaf {
                continue;
            }

            let right = total - k;
            let impurity = (k as f64 * gini(left_pos, k)
                + right as f64 * gini(total_pos - left_pos, right))
                / total as f64;

            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mid = lo + (hi - lo) / 2.0;
                let threshold = if mid < hi { mid } else { lo };
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }

        best
    }
}

// ============================================================================
// FOREST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on rows of `x` with binary labels `y`
    pub fn fit(x: ArrayView2<'_, f64>, y: &[u8], params: ForestParams) -> Result<Self, ModelError> {
        params.validate()?;
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if x.nrows() != y.len() {
            return Err(ModelError::LabelMismatch {
                rows: x.nrows(),
                labels: y.len(),
            });
        }
        if let Some(&bad) = y.iter().find(|&&label| label > 1) {
            return Err(ModelError::InvalidLabel(f64::from(bad)));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let features_per_split = params.features_per_split(x.ncols());
        let n = x.nrows();

        let trees = (0..params.n_trees)
            .map(|_| {
                let tree_seed: u64 = rng.gen();
                let mut tree_rng = StdRng::seed_from_u64(tree_seed);
                let samples: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| tree_rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };

                TreeBuilder {
                    x: x.view(),
                    y,
                    params: &params,
                    features_per_split,
                    rng: tree_rng,
                    nodes: Vec::new(),
                }
                .build(samples)
            })
            .collect::<Vec<_>>();

        let max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0);
        log::info!(
            "[Forest] Trained {} trees on {} rows x {} features (max depth {})",
            trees.len(),
            n,
            x.ncols(),
            max_depth
        );

        Ok(Self {
            params,
            n_features: x.ncols(),
            trees,
        })
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::Shape {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        if self.trees.is_empty() {
            return Err(ModelError::EmptyModel);
        }

        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn separable() -> (Array2<f64>, Vec<u8>) {
        let x = Array2::from_shape_fn((40, 3), |(i, c)| match c {
            0 => i as f64,
            1 => 5.0,
            _ => ((i * 7) % 11) as f64,
        });
        let y = (0..40).map(|i| u8::from(i >= 20)).collect();
        (x, y)
    }

    #[test]
    fn test_learns_threshold() {
        let (x, y) = separable();
        let forest = RandomForest::fit(x.view(), &y, ForestParams::default()).unwrap();

        assert_eq!(forest.predict(&[2.0, 5.0, 3.0]).unwrap(), 0);
        assert_eq!(forest.predict(&[35.0, 5.0, 3.0]).unwrap(), 1);
    }

    #[test]
    fn test_two_rows_without_bootstrap() {
        let x = array![[1.0, 0.0, 3.0], [-1.0, 0.0, 3.0]];
        let y = vec![1, 0];
        let params = ForestParams {
            n_trees: 5,
            bootstrap: false,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(x.view(), &y, params).unwrap();

        assert_eq!(forest.predict_proba(&[1.0, 0.0, 3.0]).unwrap(), 1.0);
        assert_eq!(forest.predict(&[1.0, 0.0, 3.0]).unwrap(), 1);
        assert_eq!(forest.predict(&[-1.0, 0.0, 3.0]).unwrap(), 0);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = separable();
        let a = RandomForest::fit(x.view(), &y, ForestParams::default()).unwrap();
        let b = RandomForest::fit(x.view(), &y, ForestParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_max_depth_respected() {
        let (x, y) = separable();
        let params = ForestParams {
            max_depth: Some(1),
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(x.view(), &y, params).unwrap();
        assert!(forest.trees.iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let (x, y) = separable();
        assert!(matches!(
            RandomForest::fit(x.view(), &y[..10], ForestParams::default()),
            Err(ModelError::LabelMismatch { rows: 40, labels: 10 })
        ));

        let mut bad = y.clone();
        bad[0] = 2;
        assert!(matches!(
            RandomForest::fit(x.view(), &bad, ForestParams::default()),
            Err(ModelError::InvalidLabel(_))
        ));

        let params = ForestParams {
            n_trees: 0,
            ..ForestParams::default()
        };
        assert!(RandomForest::fit(x.view(), &y, params).is_err());
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = separable();
        let forest = RandomForest::fit(x.view(), &y, ForestParams::default()).unwrap();
        assert!(matches!(
            forest.predict(&[1.0]),
            Err(ModelError::Shape { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_serde_roundtrip_predicts_identically() {
        let (x, y) = separable();
        let forest = RandomForest::fit(x.view(), &y, ForestParams::default()).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let back: RandomForest = serde_json::from_str(&json).unwrap();

        for row in x.rows() {
            let row = row.to_vec();
            assert_eq!(forest.predict_proba(&row).unwrap(), back.predict_proba(&row).unwrap());
        }
    }
}
