//! Fundbook RPC - wires the engines together behind a CLI
//!
//! The context owns the store, matcher, reconciler, journal and
//! projections; commands are thin adapters over it. Webhook consumers
//! in a deployed system drive the same `ingest` path.

pub mod commands;
pub mod context;

pub use context::{AppContext, ContextError, IngestOutcome};
