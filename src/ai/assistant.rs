use serde::Serialize;

use super::artifacts::ModelStore;
use super::classifier::{CategoryClassifier, MIN_TRAINING_RECORDS};
use super::features::{record_problem, PredictionInput};
use super::insights::{self, Insight};
use super::voice::{self, VoiceDraft};
use crate::error::{BuddyError, Result};
use crate::models::Transaction;
use crate::store::TransactionStore;

/// Result of a training request, phrased for the person who asked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainOutcome {
    pub success: bool,
    pub message: String,
    pub accuracy: Option<f64>,
}

/// The entry points the service layer calls: train, predict, voice, insights.
pub struct Assistant<S: ModelStore> {
    classifier: CategoryClassifier<S>,
}

impl<S: ModelStore> Assistant<S> {
    pub fn new(classifier: CategoryClassifier<S>) -> Self {
        Self { classifier }
    }

    pub fn train(&self, transactions: &[Transaction]) -> TrainOutcome {
        match self.classifier.train(transactions) {
            Ok(summary) => TrainOutcome {
                success: true,
                message: format!(
                    "AI model trained successfully with {} transactions",
                    summary.records
                ),
                accuracy: Some(summary.accuracy),
            },
            Err(BuddyError::InsufficientData { found, required }) => TrainOutcome {
                success: false,
                message: format!(
                    "Not enough transaction data for training. \
                     Need at least {required} transactions, found {found}."
                ),
                accuracy: None,
            },
            Err(e) => {
                tracing::error!("training failed: {e}");
                TrainOutcome {
                    success: false,
                    message: format!("Training failed: {e}"),
                    accuracy: None,
                }
            }
        }
    }

    /// Train on every user's transactions.
    pub fn train_from_store(&self, store: &impl TransactionStore) -> Result<TrainOutcome> {
        let pooled = store.all_transactions()?;
        tracing::info!(
            records = pooled.len(),
            minimum = MIN_TRAINING_RECORDS,
            "training category model from pooled transactions"
        );
        Ok(self.train(&pooled))
    }

    pub fn predict(&self, input: &PredictionInput) -> Result<String> {
        self.classifier.predict(input)
    }

    /// Suggested categories for a user's usable transactions, each paired
    /// with the record it was predicted for.
    pub fn suggest_for_user(
        &self,
        store: &impl TransactionStore,
        user_id: &str,
    ) -> Result<Vec<(Transaction, String)>> {
        let usable: Vec<Transaction> = store
            .transactions(user_id)?
            .into_iter()
            .filter(|t| match record_problem(t) {
                Some(problem) => {
                    tracing::warn!(id = %t.id, "no suggestion for record: {problem}");
                    false
                }
                None => true,
            })
            .collect();
        let predicted = self.classifier.predict_all(&usable)?;
        Ok(usable.into_iter().zip(predicted).collect())
    }

    /// Parse the text, asking the classifier for a category when no keyword
    /// matched and a model is available.
    pub fn process_voice(&self, text: &str) -> VoiceDraft {
        let mut draft = voice::parse(text);
        if draft.category.is_none() {
            match self.classifier.predict(&draft.prediction_input()) {
                Ok(category) => {
                    tracing::debug!(%category, "voice category filled in by model");
                    draft.category = Some(category);
                }
                Err(BuddyError::ModelUnavailable) => {}
                Err(e) => tracing::warn!("could not predict a category for voice input: {e}"),
            }
        }
        draft
    }

    pub fn insights(&self, transactions: &[Transaction]) -> Vec<Insight> {
        insights::analyze(transactions)
    }

    pub fn insights_for_user(
        &self,
        store: &impl TransactionStore,
        user_id: &str,
    ) -> Result<Vec<Insight>> {
        Ok(self.insights(&store.transactions(user_id)?))
    }
}
