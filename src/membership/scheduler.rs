//! Periodic roster refresh.
//!
//! The refresh is awaited inside the loop, so ticks never overlap. Cancellation
//! is only observed while waiting for the next tick: a refresh that already
//! started runs to completion (or failure) before the loop exits.

use super::store::MembershipStore;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(15 * 60);

pub struct RefreshScheduler;

impl RefreshScheduler {
    /// Spawns the refresh loop. The first refresh happens one `period` after
    /// the call, since the store was already bootstrapped.
    pub fn spawn(
        store: Arc<MembershipStore>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            Self::run(store, period, cancel).await;
        })
    }

    async fn run(store: Arc<MembershipStore>, period: Duration, cancel: CancellationToken) {
        tracing::info!("Roster refresh scheduled every {:?}", period);

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Roster refresh scheduler stopped");
                    break;
                }

                _ = interval.tick() => {
                    match store.refresh().await {
                        Ok(outcome) if outcome.changed => {
                            tracing::debug!(
                                "Scheduled refresh published generation {}",
                                outcome.generation
                            );
                        }
                        Ok(outcome) => {
                            tracing::debug!(
                                "Scheduled refresh kept generation {}",
                                outcome.generation
                            );
                        }
                        Err(e) => {
                            tracing::error!(
                                "Roster refresh failed, keeping generation {}: {}",
                                store.generation(),
                                e
                            );
                        }
                    }
                }
            }
        }
    }
}
