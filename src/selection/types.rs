use crate::membership::types::ReputationMetric;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_LIMIT: usize = 256;
pub const MAX_OFFSET: usize = 255;

/// Key used to rank the filtered workers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Uid,
    Emission,
    Incentive,
}

impl SortKey {
    /// Reputation metrics rank best-first by default, uids in roster order.
    pub fn default_order(self) -> SortOrder {
        match self {
            SortKey::Uid => SortOrder::Ascending,
            SortKey::Emission | SortKey::Incentive => SortOrder::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Per-request selection parameters.
///
/// Bounds are checked by the caller (see [`SelectionCriteria::validate`]); the
/// policy itself accepts any value and simply clamps the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCriteria {
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            sort: SortKey::Uid,
            order: SortOrder::Ascending,
            limit: 10,
            offset: 0,
        }
    }
}

impl SelectionCriteria {
    pub fn new(sort: SortKey) -> Self {
        Self {
            sort,
            order: sort.default_order(),
            ..Self::default()
        }
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn validate(&self) -> Result<(), CriteriaError> {
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(CriteriaError::InvalidLimit(self.limit));
        }
        if self.offset > MAX_OFFSET {
            return Err(CriteriaError::InvalidOffset(self.offset));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("Invalid limit value: {0}. Must be in range [1; {max}]", max = MAX_LIMIT)]
    InvalidLimit(usize),

    #[error("Invalid offset value: {0}. Must be in range [0; {max}]", max = MAX_OFFSET)]
    InvalidOffset(usize),
}

/// Excludes privileged workers whose score on `metric` is above `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReputationCeiling {
    pub metric: ReputationMetric,
    pub threshold: f64,
}

impl Default for ReputationCeiling {
    fn default() -> Self {
        Self {
            metric: ReputationMetric::Stake,
            threshold: 1_000.0,
        }
    }
}

/// How workers with an equal ranking score are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Ties always fall back to ascending uid, whatever the requested order.
    #[default]
    AscendingUid,
    /// Ties follow the requested order, so descending lists end with the lowest uid.
    FollowOrder,
}
