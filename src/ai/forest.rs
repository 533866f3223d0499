//! Seeded random forest over dense `f64` feature vectors.
//!
//! Each tree is a CART classifier grown on a bootstrap sample, choosing the
//! Gini-optimal threshold among a random subset of features at every node.
//! Trees are stored as flat node arenas so the whole forest serializes to
//! JSON and reloads without recursion.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Training hyperparameters.
#[derive(Debug, Clone)]
pub struct ForestOptions {
    pub n_trees: usize,
    pub seed: u64,
    /// Features considered per split; `None` means `sqrt(n_features)`.
    pub max_features: Option<usize>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_features: None,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        proba: Vec<f64>,
    },
    /// `feature <= threshold` goes left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn predict_proba(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { proba } => return proba,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn validate(&self, n_classes: usize, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { proba } if proba.len() != n_classes => {
                    return Err(format!(
                        "leaf {i} has {} classes, expected {n_classes}",
                        proba.len()
                    ));
                }
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {i} splits on missing feature {feature}"));
                    }
                    // Children are always pushed after their parent.
                    if *left <= i
                        || *right <= i
                        || *left >= self.nodes.len()
                        || *right >= self.nodes.len()
                    {
                        return Err(format!("node {i} has invalid children"));
                    }
                }
                TreeNode::Leaf { .. } => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_classes: usize,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on rows `x` with class indices `y` in `0..n_classes`.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        options: &ForestOptions,
    ) -> Result<Self, String> {
        if x.len() != y.len() {
            return Err("Mismatched X/Y lengths".to_string());
        }
        if x.is_empty() {
            return Err("Empty dataset".to_string());
        }
        if n_classes == 0 || y.iter().any(|&label| label >= n_classes) {
            return Err("Labels out of range".to_string());
        }
        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            return Err("Ragged feature rows".to_string());
        }
        let max_features = options
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt() as usize)
            .clamp(1, n_features.max(1));

        let mut rng = StdRng::seed_from_u64(options.seed);
        let n = x.len();
        let trees = (0..options.n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let grower = TreeGrower {
                    x,
                    y,
                    n_classes,
                    n_features,
                    max_features,
                    options,
                };
                grower.grow(bootstrap, &mut rng)
            })
            .collect();

        Ok(Self {
            n_classes,
            n_features,
            trees,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("Forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_classes, self.n_features)
                .map_err(|err| format!("tree {i}: {err}"))?;
        }
        Ok(())
    }

    /// Mean of the per-tree class distributions.
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut sum = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p;
            }
        }
        let count = self.trees.len().max(1) as f64;
        sum.into_iter().map(|s| s / count).collect()
    }

    pub fn predict(&self, features: &[f64]) -> usize {
        argmax(&self.predict_proba(features))
    }
}

/// First index of the largest value.
fn argmax(values: &[f64]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f64::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

struct Candidate {
    impurity: f64,
    feature: usize,
    threshold: f64,
}

struct TreeGrower<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    n_features: usize,
    max_features: usize,
    options: &'a ForestOptions,
}

impl TreeGrower<'_> {
    fn grow(&self, root_samples: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        let mut nodes = vec![TreeNode::Leaf { proba: Vec::new() }];
        let mut pending = vec![(0usize, root_samples, 0usize)];

        while let Some((slot, samples, depth)) = pending.pop() {
            let counts = self.class_counts(&samples);
            let depth_left = self.options.max_depth.map_or(true, |max| depth < max);
            let pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
            let split = if pure || !depth_left || samples.len() < self.options.min_samples_split {
                None
            } else {
                self.best_split(&samples, rng)
            };

            match split {
                Some(candidate) => {
                    let (left, right): (Vec<usize>, Vec<usize>) = samples
                        .iter()
                        .partition(|&&i| self.x[i][candidate.feature] <= candidate.threshold);
                    let left_slot = nodes.len();
                    let right_slot = left_slot + 1;
                    nodes.push(TreeNode::Leaf { proba: Vec::new() });
                    nodes.push(TreeNode::Leaf { proba: Vec::new() });
                    nodes[slot] = TreeNode::Split {
                        feature: candidate.feature,
                        threshold: candidate.threshold,
                        left: left_slot,
                        right: right_slot,
                    };
                    pending.push((right_slot, right, depth + 1));
                    pending.push((left_slot, left, depth + 1));
                }
                None => {
                    let total = samples.len().max(1) as f64;
                    nodes[slot] = TreeNode::Leaf {
                        proba: counts.into_iter().map(|c| c / total).collect(),
                    };
                }
            }
        }

        DecisionTree { nodes }
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in samples {
            counts[self.y[i]] += 1.0;
        }
        counts
    }

    /// Visits features in random order; stops after `max_features` once a
    /// valid split exists, otherwise keeps looking through the rest.
    fn best_split(&self, samples: &[usize], rng: &mut StdRng) -> Option<Candidate> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);

        let mut best: Option<Candidate> = None;
        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_split_on(samples, feature) {
                if best.as_ref().map_or(true, |b| candidate.impurity < b.impurity) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn best_split_on(&self, samples: &[usize], feature: usize) -> Option<Candidate> {
        let mut ordered: Vec<(f64, usize)> = samples
            .iter()
            .map(|&i| (self.x[i][feature], self.y[i]))
            .collect();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = ordered.len();
        let total = n as f64;
        let all = self.class_counts(samples);
        let mut left = vec![0.0; self.n_classes];
        let mut best: Option<Candidate> = None;

        for k in 0..n.saturating_sub(1) {
            left[ordered[k].1] += 1.0;
            let (lo, hi) = (ordered[k].0, ordered[k + 1].0);
            if lo >= hi {
                continue;
            }
            let right: Vec<f64> = all.iter().zip(&left).map(|(a, l)| a - l).collect();
            let n_left = (k + 1) as f64;
            let n_right = total - n_left;
            let impurity = (n_left * gini(&left, n_left) + n_right * gini(&right, n_right)) / total;
            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mid = lo + (hi - lo) / 2.0;
                let threshold = if mid >= hi { lo } else { mid };
                best = Some(Candidate {
                    impurity,
                    feature,
                    threshold,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let v = i as f64;
            x.push(vec![v, 0.0]);
            y.push(usize::from(i >= 10));
        }
        (x, y)
    }

    #[test]
    fn learns_a_threshold() {
        let (x, y) = separable();
        let forest = RandomForest::fit(&x, &y, 2, &ForestOptions::default()).unwrap();
        assert_eq!(forest.trees.len(), 100);
        assert_eq!(forest.predict(&[1.0, 0.0]), 0);
        assert_eq!(forest.predict(&[18.0, 0.0]), 1);
        forest.validate().unwrap();
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, y) = separable();
        let forest = RandomForest::fit(&x, &y, 2, &ForestOptions::default()).unwrap();
        let p = forest.predict_proba(&[9.5, 0.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = separable();
        let a = RandomForest::fit(&x, &y, 2, &ForestOptions::default()).unwrap();
        let b = RandomForest::fit(&x, &y, 2, &ForestOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_class_is_a_leaf() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![0, 0, 0];
        let options = ForestOptions {
            n_trees: 3,
            ..ForestOptions::default()
        };
        let forest = RandomForest::fit(&x, &y, 1, &options).unwrap();
        for tree in &forest.trees {
            assert_eq!(tree.nodes, vec![TreeNode::Leaf { proba: vec![1.0] }]);
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(RandomForest::fit(&[], &[], 2, &ForestOptions::default()).is_err());
        assert!(RandomForest::fit(&[vec![1.0]], &[3], 2, &ForestOptions::default()).is_err());
        assert!(RandomForest::fit(&[vec![1.0]], &[0, 1], 2, &ForestOptions::default()).is_err());
    }

    #[test]
    fn validate_catches_broken_children() {
        let forest = RandomForest {
            n_classes: 1,
            n_features: 1,
            trees: vec![DecisionTree {
                nodes: vec![TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 5,
                    right: 6,
                }],
            }],
        };
        assert!(forest.validate().is_err());
    }

    #[test]
    fn argmax_prefers_first_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
    }
}
