//! HTTP Protocol Definitions
//!
//! Request and response bodies for the public endpoints. Field aliases keep
//! the legacy upper-case names (`N_AXONS`, `SORT_TYPE`, `TIMEOUT`) working.

use crate::dispatch::types::DispatchResult;
use crate::error::GatewayError;
use crate::selection::types::{SelectionCriteria, SortKey, SortOrder};

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENDPOINT_DETECT: &str = "/detect/";
pub const ENDPOINT_DETECT_BY_UID: &str = "/detect/uids/";
pub const ENDPOINT_ROSTER: &str = "/roster/";

pub const MAX_DIRECT_UIDS: usize = 256;

fn default_limit() -> usize {
    10
}

fn default_timeout() -> f64 {
    3.0
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    #[serde(alias = "text")]
    pub texts: Vec<String>,

    #[serde(default = "default_limit", alias = "N_AXONS")]
    pub limit: usize,

    #[serde(default, alias = "SORT_TYPE")]
    pub sort: SortKey,

    /// Defaults to the sort key's natural order when omitted.
    #[serde(default)]
    pub order: Option<SortOrder>,

    #[serde(default)]
    pub offset: usize,

    /// Per-worker timeout in seconds.
    #[serde(default = "default_timeout", alias = "TIMEOUT")]
    pub timeout: f64,
}

impl DetectRequest {
    pub fn criteria(&self) -> SelectionCriteria {
        SelectionCriteria::new(self.sort)
            .order(self.order.unwrap_or(self.sort.default_order()))
            .limit(self.limit)
            .offset(self.offset)
    }
}

#[derive(Debug, Deserialize)]
pub struct DetectByUidRequest {
    #[serde(alias = "text")]
    pub texts: Vec<String>,

    pub uids: Vec<u16>,

    #[serde(default = "default_timeout", alias = "TIMEOUT")]
    pub timeout: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub uid: u16,
    pub coldkey: String,
    pub hotkey: String,
    pub predictions: Option<Vec<f64>>,
    pub stake: f64,
    pub emission: f64,
    pub incentive: f64,
}

impl From<DispatchResult> for WorkerResponse {
    fn from(result: DispatchResult) -> Self {
        let predictions = result.predictions().map(|p| p.to_vec());
        let worker = result.worker;

        Self {
            uid: worker.id.0,
            coldkey: worker.coldkey,
            hotkey: worker.hotkey,
            predictions,
            stake: worker.reputation.stake,
            emission: worker.reputation.emission,
            incentive: worker.reputation.incentive,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectResponse {
    pub generation: u64,
    pub responses: Vec<WorkerResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RosterResponse {
    pub generation: u64,
    pub workers: usize,
    pub serving: usize,
}

/// Converts the request's timeout in seconds into a `Duration`.
pub fn parse_timeout(seconds: f64) -> Result<Duration, GatewayError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(GatewayError::InvalidRequest(format!(
            "Invalid timeout value: {}. Must be greater than 0",
            seconds
        )));
    }

    Duration::try_from_secs_f64(seconds)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid timeout value: {}", e)))
}
