use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Position of a worker inside one roster generation.
///
/// Ids are dense: a snapshot with `n` workers contains exactly the ids `0..n`,
/// and `workers[i].id == WorkerId(i)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct WorkerId(pub u16);

impl WorkerId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid{}", self.0)
    }
}

/// Reputation scores tracked for every worker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReputationMetric {
    Stake,
    Emission,
    Incentive,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reputation {
    pub stake: f64,
    pub emission: f64,
    pub incentive: f64,
}

impl Reputation {
    pub fn score(&self, metric: ReputationMetric) -> f64 {
        match metric {
            ReputationMetric::Stake => self.stake,
            ReputationMetric::Emission => self.emission,
            ReputationMetric::Incentive => self.incentive,
        }
    }
}

/// A single member of the published roster.
///
/// `coldkey` identifies the owner and `hotkey` the serving wallet. Records are
/// never mutated once they are part of a published snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub endpoint: SocketAddr,
    pub is_serving: bool,
    pub validator_permit: bool,
    pub reputation: Reputation,
    pub coldkey: String,
    pub hotkey: String,
}

/// Immutable point-in-time view of the roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    /// Source-chain height the roster was read at.
    pub generation: u64,
    pub workers: Vec<WorkerRecord>,
}

impl MembershipSnapshot {
    pub fn get(&self, id: WorkerId) -> Option<&WorkerRecord> {
        self.workers.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn serving_count(&self) -> usize {
        self.workers.iter().filter(|w| w.is_serving).count()
    }
}

/// One neuron as reported by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuronInfo {
    pub uid: u16,
    pub ip: String,
    pub port: u16,
    pub is_serving: bool,
    #[serde(default)]
    pub validator_permit: bool,
    #[serde(default)]
    pub stake: f64,
    #[serde(default)]
    pub emission: f64,
    #[serde(default)]
    pub incentive: f64,
    pub coldkey: String,
    pub hotkey: String,
}

/// Raw roster payload returned by a [`RegistrySource`](super::source::RegistrySource).
///
/// `block` is the chain height and doubles as the snapshot generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    pub block: u64,
    pub neurons: Vec<NeuronInfo>,
}

/// What a single refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub generation: u64,
    pub changed: bool,
    pub workers: usize,
}
