use crate::dispatch::dispatcher::{DispatchError, Dispatcher};
use crate::dispatch::types::{DispatchResult, TextQuery};
use crate::error::GatewayError;
use crate::membership::store::MembershipStore;
use crate::membership::types::{WorkerId, WorkerRecord};
use crate::selection::policy::SelectionPolicy;
use crate::selection::types::SelectionCriteria;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Results of one request, tagged with the roster generation they were selected from.
#[derive(Debug)]
pub struct Detection {
    pub generation: u64,
    pub results: Vec<DispatchResult>,
}

/// Ties the roster, the selection policy and the dispatcher together.
pub struct GatewayService {
    store: Arc<MembershipStore>,
    policy: SelectionPolicy,
    dispatcher: Dispatcher,
}

impl GatewayService {
    pub fn new(
        store: Arc<MembershipStore>,
        policy: SelectionPolicy,
        dispatcher: Dispatcher,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            policy,
            dispatcher,
        })
    }

    pub fn store(&self) -> &Arc<MembershipStore> {
        &self.store
    }

    /// Selects workers from the current snapshot and queries them.
    pub async fn detect(
        &self,
        query: TextQuery,
        criteria: SelectionCriteria,
        timeout: Duration,
    ) -> Result<Detection, GatewayError> {
        criteria.validate()?;
        ensure_timeout(timeout)?;

        let snapshot = self.store.snapshot();
        let selected = self.policy.select(&snapshot, &criteria);

        tracing::info!(
            "Selected {} of {} workers (generation {}, sort={:?} order={:?} offset={} limit={})",
            selected.len(),
            snapshot.len(),
            snapshot.generation,
            criteria.sort,
            criteria.order,
            criteria.offset,
            criteria.limit
        );

        let results = self.dispatcher.dispatch(&selected, &query, timeout).await?;

        Ok(Detection {
            generation: snapshot.generation,
            results,
        })
    }

    /// Queries an explicit list of workers, bypassing the selection policy.
    ///
    /// Duplicate ids are dropped, keeping the first occurrence.
    pub async fn detect_workers(
        &self,
        query: TextQuery,
        ids: &[WorkerId],
        timeout: Duration,
    ) -> Result<Detection, GatewayError> {
        ensure_timeout(timeout)?;

        let snapshot = self.store.snapshot();
        let mut seen = HashSet::new();
        let mut selected: Vec<WorkerRecord> = Vec::with_capacity(ids.len());

        for id in ids {
            if !seen.insert(*id) {
                continue;
            }
            let worker = snapshot.get(*id).ok_or(GatewayError::UnknownWorker(id.0))?;
            selected.push(worker.clone());
        }

        tracing::info!(
            "Directly addressing {} workers (generation {})",
            selected.len(),
            snapshot.generation
        );

        let results = self.dispatcher.dispatch(&selected, &query, timeout).await?;

        Ok(Detection {
            generation: snapshot.generation,
            results,
        })
    }
}

fn ensure_timeout(timeout: Duration) -> Result<(), GatewayError> {
    if timeout.is_zero() {
        return Err(DispatchError::InvalidTimeout(timeout).into());
    }
    Ok(())
}
