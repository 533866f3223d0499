//! Category prediction: standardize the six features, then vote with a
//! random forest. One trained pipeline exists at a time, both on disk and in
//! memory; retraining replaces it.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Local;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::artifacts::{ModelKind, ModelStore};
use super::features::{self, FeatureRow, LabeledRow, PredictionInput, FEATURE_COUNT, FEATURE_NAMES};
use super::forest::{ForestOptions, RandomForest};
use super::scaler::StandardScaler;
use crate::error::{BuddyError, Result};
use crate::models::Transaction;

pub const MIN_TRAINING_RECORDS: usize = 10;
const TEST_FRACTION: f64 = 0.2;
const SPLIT_SEED: u64 = 42;
const FORMAT_VERSION: u32 = 1;

/// The persisted model: scaler and forest plus the label vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPipeline {
    pub format_version: u32,
    pub trained_on: String,
    pub training_records: usize,
    /// Accuracy on the held-out split at training time.
    pub accuracy: f64,
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub scaler: StandardScaler,
    pub forest: RandomForest,
}

/// What a successful training run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub records: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
    pub classes: Vec<String>,
}

impl CategoryPipeline {
    /// Hold out a seeded 20% test split, fit on the rest, and score.
    pub fn train(rows: &[LabeledRow], options: &ForestOptions) -> Result<(Self, TrainSummary)> {
        if rows.len() < MIN_TRAINING_RECORDS {
            return Err(BuddyError::InsufficientData {
                found: rows.len(),
                required: MIN_TRAINING_RECORDS,
            });
        }

        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(SPLIT_SEED));
        let test_size = (rows.len() as f64 * TEST_FRACTION).ceil() as usize;
        let (test_idx, train_idx) = order.split_at(test_size);
        let train: Vec<&LabeledRow> = train_idx.iter().map(|&i| &rows[i]).collect();
        let test: Vec<&LabeledRow> = test_idx.iter().map(|&i| &rows[i]).collect();

        let classes: Vec<String> = train
            .iter()
            .map(|r| r.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let raw: Vec<Vec<f64>> = train.iter().map(|r| r.features.to_vector().to_vec()).collect();
        let scaler = StandardScaler::fit(&raw, FEATURE_COUNT);
        let x: Vec<Vec<f64>> = raw.iter().map(|row| scaler.transform(row)).collect();
        let y: Vec<usize> = train
            .iter()
            .map(|r| classes.binary_search(&r.category).unwrap_or_default())
            .collect();
        let forest = RandomForest::fit(&x, &y, classes.len(), options)
            .map_err(BuddyError::InvalidRecord)?;

        let mut pipeline = Self {
            format_version: FORMAT_VERSION,
            trained_on: Local::now().date_naive().to_string(),
            training_records: rows.len(),
            accuracy: 0.0,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            classes,
            scaler,
            forest,
        };
        pipeline.accuracy = pipeline.score(test.iter().copied());

        let summary = TrainSummary {
            records: rows.len(),
            train_size: train.len(),
            test_size: test.len(),
            accuracy: pipeline.accuracy,
            classes: pipeline.classes.clone(),
        };
        Ok((pipeline, summary))
    }

    pub fn predict(&self, row: &FeatureRow) -> &str {
        let scaled = self.scaler.transform(&row.to_vector());
        &self.classes[self.forest.predict(&scaled)]
    }

    /// Fraction of rows whose label is predicted exactly.
    pub fn score<'a>(&self, rows: impl IntoIterator<Item = &'a LabeledRow>) -> f64 {
        let mut total = 0usize;
        let mut correct = 0usize;
        for row in rows {
            total += 1;
            if self.predict(&row.features) == row.category {
                correct += 1;
            }
        }
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!("unsupported model format {}", self.format_version));
        }
        if self.classes.is_empty() || self.classes.len() != self.forest.n_classes {
            return Err("class list does not match the forest".to_string());
        }
        if self.scaler.width() != FEATURE_COUNT || self.forest.n_features != FEATURE_COUNT {
            return Err(format!("model expects {FEATURE_COUNT} features"));
        }
        if !self.feature_names.iter().map(String::as_str).eq(FEATURE_NAMES) {
            return Err(format!(
                "model was trained on features {:?}, expected {FEATURE_NAMES:?}",
                self.feature_names
            ));
        }
        self.forest.validate()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let pipeline: Self = serde_json::from_slice(bytes)
            .map_err(|e| BuddyError::StorageFailure(format!("corrupt category model: {e}")))?;
        pipeline
            .validate()
            .map_err(|e| BuddyError::StorageFailure(format!("invalid category model: {e}")))?;
        Ok(pipeline)
    }
}

/// Owns the current category model and its artifact store.
pub struct CategoryClassifier<S: ModelStore> {
    store: S,
    options: ForestOptions,
    current: RwLock<Option<Arc<CategoryPipeline>>>,
}

impl<S: ModelStore> CategoryClassifier<S> {
    /// Starts with no model in memory; the artifact is read lazily.
    pub fn new(store: S) -> Self {
        Self::with_options(store, ForestOptions::default())
    }

    pub fn with_options(store: S, options: ForestOptions) -> Self {
        Self {
            store,
            options,
            current: RwLock::new(None),
        }
    }

    pub fn current(&self) -> Option<Arc<CategoryPipeline>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[allow(dead_code)]
    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }

    fn install(&self, pipeline: CategoryPipeline) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(pipeline));
    }

    /// Train on `transactions`, persist the result, then make it current.
    /// Nothing is written when there are too few usable records.
    pub fn train(&self, transactions: &[Transaction]) -> Result<TrainSummary> {
        let rows = features::extract_labeled(transactions).unwrap_or_default();
        let (pipeline, summary) = CategoryPipeline::train(&rows, &self.options)?;
        self.store.save(ModelKind::Category, &pipeline.to_bytes()?)?;
        self.install(pipeline);
        tracing::info!(
            records = summary.records,
            train = summary.train_size,
            test = summary.test_size,
            classes = ?summary.classes,
            accuracy = summary.accuracy,
            "category prediction model trained with accuracy {:.2}",
            summary.accuracy
        );
        Ok(summary)
    }

    /// Read the persisted artifact into memory. `Ok(false)` when none exists.
    pub fn load(&self) -> Result<bool> {
        let Some(bytes) = self.store.load(ModelKind::Category)? else {
            return Ok(false);
        };
        match CategoryPipeline::from_bytes(&bytes) {
            Ok(pipeline) => {
                self.install(pipeline);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("error loading category model: {e}");
                Err(e)
            }
        }
    }

    /// The in-memory model, loading it from storage if needed.
    pub fn ensure_loaded(&self) -> Result<Arc<CategoryPipeline>> {
        if let Some(pipeline) = self.current() {
            return Ok(pipeline);
        }
        if self.load()? {
            if let Some(pipeline) = self.current() {
                return Ok(pipeline);
            }
        }
        Err(BuddyError::ModelUnavailable)
    }

    pub fn predict(&self, input: &PredictionInput) -> Result<String> {
        let pipeline = self.ensure_loaded()?;
        Ok(pipeline.predict(&input.to_row()).to_string())
    }

    /// One category per usable record, in input order. Malformed records
    /// are skipped, so callers wanting a 1:1 pairing filter them first.
    pub fn predict_all(&self, transactions: &[Transaction]) -> Result<Vec<String>> {
        let pipeline = self.ensure_loaded()?;
        let rows = features::extract(transactions).unwrap_or_default();
        Ok(rows.iter().map(|row| pipeline.predict(row).to_string()).collect())
    }
}
