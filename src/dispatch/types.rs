use crate::membership::types::WorkerRecord;
use serde::{Deserialize, Serialize};

/// Payload fanned out to every selected worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextQuery {
    pub texts: Vec<String>,
}

/// What a worker sends back: one probability per submitted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextResponse {
    pub predictions: Vec<f64>,
}

impl TextResponse {
    /// Checks the answer against the query it responds to.
    pub fn validate(&self, query: &TextQuery) -> Result<(), String> {
        if self.predictions.len() != query.texts.len() {
            return Err(format!(
                "expected {} predictions, got {}",
                query.texts.len(),
                self.predictions.len()
            ));
        }
        if let Some(bad) = self.predictions.iter().find(|p| !p.is_finite()) {
            return Err(format!("non-finite prediction {}", bad));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Predictions(Vec<f64>),
    TimedOut,
    Failed(String),
}

/// One slot of a dispatch, tied to the worker it was sent to.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub worker: WorkerRecord,
    pub outcome: DispatchOutcome,
}

impl DispatchResult {
    /// Predictions if the worker answered in time with a well-formed payload.
    pub fn predictions(&self) -> Option<&[f64]> {
        match &self.outcome {
            DispatchOutcome::Predictions(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Predictions(_))
    }
}
