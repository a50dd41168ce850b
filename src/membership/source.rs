//! Registry Sources
//!
//! Adapters that fetch the raw roster from wherever membership is recorded.
//! The store only depends on the [`RegistrySource`] trait; the concrete client
//! for the ledger lives outside the core.

use super::types::Roster;

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Default upper bound for a single roster fetch.
pub const REGISTRY_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn fetch_roster(&self) -> Result<Roster>;

    /// Human readable origin, used in log lines.
    fn describe(&self) -> String;
}

/// Fetches `GET {base_url}/roster/{netuid}` from a roster service.
pub struct HttpRegistrySource {
    base_url: String,
    netuid: u16,
    http_client: reqwest::Client,
    attempts: usize,
}

impl HttpRegistrySource {
    pub fn new(base_url: &str, netuid: u16) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REGISTRY_FETCH_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            netuid,
            http_client,
            attempts: 3,
        })
    }

    fn roster_url(&self) -> String {
        format!("{}/roster/{}", self.base_url, self.netuid)
    }

    /// Connection errors and 5xx answers are retried with exponential backoff;
    /// any other response is handed back to the caller.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 1..=self.attempts {
            let failure = match self.http_client.get(url).send().await {
                Ok(resp) if !resp.status().is_server_error() => return Ok(resp),
                Ok(resp) => anyhow::anyhow!("Registry answered {}", resp.status()),
                Err(e) => anyhow::Error::new(e),
            };

            if attempt == self.attempts {
                return Err(failure.context(format!(
                    "Roster fetch failed after {} attempts",
                    self.attempts
                )));
            }

            tracing::debug!(
                "Roster fetch attempt {}/{} failed: {}",
                attempt,
                self.attempts,
                failure
            );
            let jitter = rand::random::<u64>() % 50;
            tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
            delay_ms = (delay_ms * 2).min(1200);
        }

        Err(anyhow::anyhow!("Roster fetch configured with zero attempts"))
    }
}

#[async_trait]
impl RegistrySource for HttpRegistrySource {
    async fn fetch_roster(&self) -> Result<Roster> {
        let response = self.get_with_retry(&self.roster_url()).await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Roster request failed: {}",
                response.status()
            ));
        }

        let roster: Roster = response.json().await?;
        Ok(roster)
    }

    fn describe(&self) -> String {
        self.roster_url()
    }
}

/// Reads a JSON roster from disk on every fetch.
pub struct FileRegistrySource {
    path: PathBuf,
}

impl FileRegistrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RegistrySource for FileRegistrySource {
    async fn fetch_roster(&self) -> Result<Roster> {
        let raw = tokio::fs::read(&self.path).await?;
        let roster: Roster = serde_json::from_slice(&raw)?;
        Ok(roster)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory roster that can be swapped at runtime.
#[derive(Clone)]
pub struct StaticRegistrySource {
    roster: Arc<RwLock<Roster>>,
}

impl StaticRegistrySource {
    pub fn new(roster: Roster) -> Self {
        Self {
            roster: Arc::new(RwLock::new(roster)),
        }
    }

    pub fn replace(&self, roster: Roster) {
        match self.roster.write() {
            Ok(mut guard) => *guard = roster,
            Err(poisoned) => *poisoned.into_inner() = roster,
        }
    }
}

#[async_trait]
impl RegistrySource for StaticRegistrySource {
    async fn fetch_roster(&self) -> Result<Roster> {
        self.roster
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| anyhow::anyhow!("Static roster lock poisoned"))
    }

    fn describe(&self) -> String {
        "static roster".to_string()
    }
}

/// Picks an adapter from a `--registry` value: http(s) URLs go to
/// [`HttpRegistrySource`], anything else is treated as a file path.
pub fn from_location(location: &str, netuid: u16) -> Result<Arc<dyn RegistrySource>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Arc::new(HttpRegistrySource::new(location, netuid)?))
    } else {
        Ok(Arc::new(FileRegistrySource::new(location)))
    }
}
