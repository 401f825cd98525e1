//! Fundbook Projections - read models over the journal
//!
//! Three query surfaces for dashboards and the merchant portal:
//! - team stats, maintained two equivalent ways (read-time aggregation
//!   and versioned incremental counters) - the two must always agree
//! - a SQLite payment feed with the dashboard's filters
//! - next-payment schedule projections

pub mod engine;
pub mod error;
pub mod feed;
pub mod schedule;
pub mod stats;

pub use engine::ProjectionEngine;
pub use error::ProjectionError;
pub use feed::{FeedFilter, FeedRow, PaymentFeed};
pub use schedule::{next_payment, NextPayment};
pub use stats::{StatsConfig, StatsCounters, TeamStats};
