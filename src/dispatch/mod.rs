//! Query Dispatch Module
//!
//! Delivers a text query to the selected workers in parallel and collects their
//! predictions.
//!
//! ## Submodules
//! - **`dispatcher`**: task-per-worker fan-out with a shared per-call timeout.
//! - **`transport`**: the remote-call primitive (`WorkerTransport`) and its HTTP implementation.
//! - **`types`**: query/response payloads and per-worker results.

pub mod dispatcher;
pub mod transport;
pub mod types;
