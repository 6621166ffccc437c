//! Composition root for a node hosting hold'em tables.

pub mod audit;
pub mod config;
pub mod logging;
pub mod metrics;
