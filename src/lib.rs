//! Inference Gateway Library
//!
//! Fans text-classification requests out to a subset of remote workers chosen
//! from a periodically refreshed roster, and gathers their predictions within a
//! deadline.
//!
//! ## Architecture Modules
//! - **`membership`**: The roster layer. Holds an immutable snapshot of workers behind an
//!   atomic pointer, refreshed on a schedule from an external registry.
//! - **`selection`**: Filtering and ranking of workers (serving flag, validator ceiling,
//!   uid/emission/incentive ordering, offset and limit).
//! - **`dispatch`**: Concurrent fan-out of one query to many workers with per-call timeouts
//!   and isolated failures.
//! - **`gateway`**: The request-serving service and its HTTP layer.
//! - **`config`** / **`error`**: Process configuration and request-level errors.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod membership;
pub mod selection;
