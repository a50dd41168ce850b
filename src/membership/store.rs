use super::source::RegistrySource;
use super::types::{MembershipSnapshot, RefreshOutcome, Reputation, Roster, WorkerId, WorkerRecord};

use arc_swap::ArcSwap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("registry source failed: {0}")]
    Source(#[from] anyhow::Error),

    #[error("malformed roster: {0}")]
    MalformedRoster(String),
}

/// Holds the published roster snapshot.
///
/// Readers load the current `Arc<MembershipSnapshot>` without locking. Refreshes
/// are serialized through `refresh_lock` and publish a brand new snapshot with a
/// single pointer swap, so a reader sees either the old or the new roster.
pub struct MembershipStore {
    current: ArcSwap<MembershipSnapshot>,
    refresh_lock: Mutex<()>,
    source: Arc<dyn RegistrySource>,
}

impl MembershipStore {
    /// Fetches the first roster and fails if it cannot be loaded.
    pub async fn bootstrap(source: Arc<dyn RegistrySource>) -> Result<Arc<Self>, RefreshError> {
        tracing::info!("Loading initial roster from {}", source.describe());

        let roster = source.fetch_roster().await?;
        let snapshot = build_snapshot(roster)?;

        tracing::info!(
            "Initial roster loaded: generation={} workers={} serving={}",
            snapshot.generation,
            snapshot.len(),
            snapshot.serving_count()
        );

        Ok(Self::with_snapshot(source, snapshot))
    }

    pub fn with_snapshot(
        source: Arc<dyn RegistrySource>,
        snapshot: MembershipSnapshot,
    ) -> Arc<Self> {
        Arc::new(Self {
            current: ArcSwap::from_pointee(snapshot),
            refresh_lock: Mutex::new(()),
            source,
        })
    }

    pub fn snapshot(&self) -> Arc<MembershipSnapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Re-reads the roster and publishes it if the generation advanced.
    ///
    /// On error the previously published snapshot stays in place.
    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let _guard = self.refresh_lock.lock().await;

        let previous = self.current.load_full();
        let roster = self.source.fetch_roster().await?;

        if roster.block <= previous.generation {
            if roster.block == previous.generation {
                tracing::warn!(
                    "Roster generation unchanged at {}, registry source may be stalled",
                    previous.generation
                );
            } else {
                tracing::warn!(
                    "Registry returned older roster (generation {} < {}), keeping current",
                    roster.block,
                    previous.generation
                );
            }

            return Ok(RefreshOutcome {
                generation: previous.generation,
                changed: false,
                workers: previous.len(),
            });
        }

        let snapshot = build_snapshot(roster)?;
        let outcome = RefreshOutcome {
            generation: snapshot.generation,
            changed: true,
            workers: snapshot.len(),
        };

        tracing::info!(
            "Roster refreshed: generation {} -> {} ({} workers, {} serving)",
            previous.generation,
            snapshot.generation,
            snapshot.len(),
            snapshot.serving_count()
        );

        self.current.store(Arc::new(snapshot));

        Ok(outcome)
    }
}

/// Turns a raw roster into a snapshot whose positions match worker ids.
pub fn build_snapshot(roster: Roster) -> Result<MembershipSnapshot, RefreshError> {
    let mut neurons = roster.neurons;
    neurons.sort_by_key(|n| n.uid);

    let mut workers = Vec::with_capacity(neurons.len());

    for (position, neuron) in neurons.into_iter().enumerate() {
        if neuron.uid as usize != position {
            return Err(RefreshError::MalformedRoster(format!(
                "expected uid {} but found {} (uids must be unique and contiguous from 0)",
                position, neuron.uid
            )));
        }

        let (endpoint, is_serving) = match neuron.ip.parse::<IpAddr>() {
            Ok(ip) => (SocketAddr::new(ip, neuron.port), neuron.is_serving),
            Err(_) => {
                tracing::warn!(
                    "Worker uid{} advertises invalid ip {:?}, marking as not serving",
                    neuron.uid,
                    neuron.ip
                );
                (SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), neuron.port), false)
            }
        };

        workers.push(WorkerRecord {
            id: WorkerId(neuron.uid),
            endpoint,
            is_serving,
            validator_permit: neuron.validator_permit,
            reputation: Reputation {
                stake: neuron.stake,
                emission: neuron.emission,
                incentive: neuron.incentive,
            },
            coldkey: neuron.coldkey,
            hotkey: neuron.hotkey,
        });
    }

    Ok(MembershipSnapshot {
        generation: roster.block,
        workers,
    })
}
