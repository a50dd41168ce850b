//! Concurrent Fan-out
//!
//! Sends one query to many workers at once and gathers every answer, whether it
//! arrived, timed out or failed.
//!
//! ## Guarantees
//! - **Isolation**: each worker call runs in its own task under its own timeout. A slow,
//!   failing or panicking worker only affects its own slot.
//! - **Barrier**: `dispatch` returns after every call has finished or timed out.
//! - **Ordering**: results come back in the order the workers were given, regardless of
//!   completion order.
//! - **Cancellation**: dropping the `dispatch` future aborts the calls still in flight.

use super::transport::WorkerTransport;
use super::types::*;
use crate::membership::types::WorkerRecord;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;

#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("Invalid timeout value: {0:?}. Must be greater than 0")]
    InvalidTimeout(Duration),
}

pub struct Dispatcher {
    transport: Arc<dyn WorkerTransport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn WorkerTransport>) -> Self {
        Self { transport }
    }

    pub async fn dispatch(
        &self,
        workers: &[WorkerRecord],
        query: &TextQuery,
        timeout: Duration,
    ) -> Result<Vec<DispatchResult>, DispatchError> {
        if timeout.is_zero() {
            return Err(DispatchError::InvalidTimeout(timeout));
        }

        let started = Instant::now();
        let query = Arc::new(query.clone());

        // Dropping the set aborts every call still running, so an abandoned
        // request does not leave calls behind.
        let mut calls = JoinSet::new();
        for (slot, worker) in workers.iter().cloned().enumerate() {
            let transport = self.transport.clone();
            let query = query.clone();
            calls.spawn(async move {
                let result = call_worker(transport, worker, query, timeout).await;
                (slot, result)
            });
        }

        let mut slots: Vec<Option<DispatchResult>> = vec![None; workers.len()];
        while let Some(joined) = calls.join_next().await {
            match joined {
                Ok((slot, result)) => slots[slot] = Some(result),
                Err(e) => tracing::warn!("Worker call task aborted: {}", e),
            }
        }

        // A slot left empty belongs to a task that panicked.
        let results: Vec<DispatchResult> = slots
            .into_iter()
            .zip(workers.iter())
            .map(|(slot, worker)| {
                slot.unwrap_or_else(|| DispatchResult {
                    worker: worker.clone(),
                    outcome: DispatchOutcome::Failed("call task aborted".to_string()),
                })
            })
            .collect();

        let answered = results.iter().filter(|r| r.is_answered()).count();
        let timed_out = results
            .iter()
            .filter(|r| r.outcome == DispatchOutcome::TimedOut)
            .count();

        tracing::info!(
            "Dispatched to {} workers in {:?}: {} answered, {} timed out, {} failed",
            results.len(),
            started.elapsed(),
            answered,
            timed_out,
            results.len() - answered - timed_out
        );

        Ok(results)
    }
}

async fn call_worker(
    transport: Arc<dyn WorkerTransport>,
    worker: WorkerRecord,
    query: Arc<TextQuery>,
    timeout: Duration,
) -> DispatchResult {
    let call = transport.call(&worker, &query, timeout);
    let outcome = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(response)) => match response.validate(&query) {
            Ok(()) => DispatchOutcome::Predictions(response.predictions),
            Err(reason) => {
                tracing::debug!("Worker {} sent malformed response: {}", worker.id, reason);
                DispatchOutcome::Failed(reason)
            }
        },
        Ok(Err(e)) if is_timeout(&e) => {
            tracing::debug!("Worker {} transport timed out after {:?}", worker.id, timeout);
            DispatchOutcome::TimedOut
        }
        Ok(Err(e)) => {
            tracing::debug!("Worker {} at {} failed: {}", worker.id, worker.endpoint, e);
            DispatchOutcome::Failed(e.to_string())
        }
        Err(_) => {
            tracing::debug!("Worker {} timed out after {:?}", worker.id, timeout);
            DispatchOutcome::TimedOut
        }
    };

    DispatchResult { worker, outcome }
}

/// The transport enforces the same deadline and may report it before the outer
/// timer fires.
fn is_timeout(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_timeout())
    })
}
