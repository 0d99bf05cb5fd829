//! Shared utilities for the jigdex indexer.

pub mod logging;
pub mod stats;

pub use logging::init_tracing;
pub use stats::StatsCounter;
