//! HTTP adapter for the jojo script runner.
//!
//! Exposes the script registry and execution engine from `jojo-core` as a
//! small JSON API. The binary in `main.rs` wires configuration, tracing and
//! the listener; everything else lives here so integration tests can build
//! the same router.

pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod router;
pub mod routes;
pub mod state;
