use super::types::*;
use crate::membership::types::{MembershipSnapshot, WorkerRecord};

use std::cmp::Ordering;

/// Deployment-wide selection rules.
///
/// `select` is a pure function of the snapshot and the criteria: no hidden
/// state, same input, same output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    /// Drop workers that do not advertise a serving endpoint.
    pub require_serving: bool,
    pub ceiling: Option<ReputationCeiling>,
    pub tie_break: TieBreak,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            require_serving: true,
            ceiling: Some(ReputationCeiling::default()),
            tie_break: TieBreak::AscendingUid,
        }
    }
}

impl SelectionPolicy {
    pub fn is_eligible(&self, worker: &WorkerRecord) -> bool {
        if self.require_serving && !worker.is_serving {
            return false;
        }

        match self.ceiling {
            Some(ceiling) if worker.validator_permit => {
                worker.reputation.score(ceiling.metric) <= ceiling.threshold
            }
            _ => true,
        }
    }

    pub fn select(
        &self,
        snapshot: &MembershipSnapshot,
        criteria: &SelectionCriteria,
    ) -> Vec<WorkerRecord> {
        let mut candidates: Vec<&WorkerRecord> = snapshot
            .workers
            .iter()
            .filter(|worker| self.is_eligible(worker))
            .collect();

        candidates.sort_by(|a, b| self.compare(a, b, criteria));

        candidates
            .into_iter()
            .skip(criteria.offset)
            .take(criteria.limit)
            .cloned()
            .collect()
    }

    fn compare(
        &self,
        a: &WorkerRecord,
        b: &WorkerRecord,
        criteria: &SelectionCriteria,
    ) -> Ordering {
        let primary = match criteria.sort {
            SortKey::Uid => a.id.cmp(&b.id),
            SortKey::Emission => a.reputation.emission.total_cmp(&b.reputation.emission),
            SortKey::Incentive => a.reputation.incentive.total_cmp(&b.reputation.incentive),
        };

        let primary = match criteria.order {
            SortOrder::Ascending => primary,
            SortOrder::Descending => primary.reverse(),
        };

        let tie = match (self.tie_break, criteria.order) {
            (TieBreak::FollowOrder, SortOrder::Descending) => b.id.cmp(&a.id),
            _ => a.id.cmp(&b.id),
        };

        primary.then(tie)
    }
}
