//! Worker Transport
//!
//! The remote-call primitive used by the dispatcher. Implementations must give
//! up once `timeout` has elapsed even when the peer never replies. A timeout
//! reported as a `reqwest::Error` is counted as a timeout, not a failure.

use super::types::{TextQuery, TextResponse};
use crate::membership::types::WorkerRecord;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

pub const ENDPOINT_TEXT_SYNAPSE: &str = "/TextSynapse";

#[async_trait]
pub trait WorkerTransport: Send + Sync {
    async fn call(
        &self,
        worker: &WorkerRecord,
        query: &TextQuery,
        timeout: Duration,
    ) -> Result<TextResponse>;
}

#[derive(Serialize)]
struct SynapseBody<'a> {
    texts: &'a [String],
    predictions: [f64; 0],
}

/// Posts the query as JSON to `http://{endpoint}/TextSynapse`.
pub struct HttpWorkerTransport {
    http_client: reqwest::Client,
}

impl HttpWorkerTransport {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpWorkerTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerTransport for HttpWorkerTransport {
    async fn call(
        &self,
        worker: &WorkerRecord,
        query: &TextQuery,
        timeout: Duration,
    ) -> Result<TextResponse> {
        let url = format!("http://{}{}", worker.endpoint, ENDPOINT_TEXT_SYNAPSE);
        let body = SynapseBody {
            texts: &query.texts,
            predictions: [],
        };

        let response = self
            .http_client
            .post(url)
            .header("x-worker-hotkey", worker.hotkey.as_str())
            .json(&body)
            .timeout(timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "worker {} answered {}",
                worker.id,
                response.status()
            ));
        }

        let parsed: TextResponse = response.json().await?;
        Ok(parsed)
    }
}
