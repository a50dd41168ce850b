//! Worker Membership Module
//!
//! Keeps the gateway's view of the worker roster: who exists, where they listen,
//! whether they are serving, and how the registry rates them.
//!
//! ## Core Mechanisms
//! - **Snapshots**: The roster is an immutable `MembershipSnapshot` behind an atomically
//!   swapped pointer. Request handlers read it without taking any lock.
//! - **Serialized Refresh**: Only one refresh runs at a time. A refresh builds a new snapshot
//!   and publishes it in one swap; failures leave the previous snapshot in place.
//! - **Generations**: Each snapshot carries the registry's block height. An unchanged height
//!   means the upstream source is stalled and nothing is published.

pub mod scheduler;
pub mod source;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;
