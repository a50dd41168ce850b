//! Worker Selection Module
//!
//! Chooses which workers receive a request and in which order.
//!
//! ## Pipeline
//! 1. **Filter**: drop workers that are not serving, and privileged workers whose
//!    reputation exceeds the configured ceiling.
//! 2. **Rank**: sort by uid, emission or incentive, ascending or descending, with a
//!    deterministic uid tie-break.
//! 3. **Window**: skip `offset` workers and keep at most `limit`.

pub mod policy;
pub mod types;
