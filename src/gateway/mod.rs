//! Gateway Module
//!
//! The request-serving side of the process: one service object that turns a
//! query plus selection criteria into per-worker results, and the axum layer
//! in front of it.
//!
//! ## Submodules
//! - **`service`**: snapshot -> select (or direct addressing) -> dispatch.
//! - **`handlers`**: HTTP handlers and the router.
//! - **`protocol`**: request/response bodies and endpoint paths.
//! - **`auth`**: shared-key middleware.

pub mod auth;
pub mod handlers;
pub mod protocol;
pub mod service;
