//! The jigdex transaction dependency engine.
//!
//! Indexes a stream of blockchain transactions carrying embedded executable
//! metadata and the object states their replay derives. The core is the
//! persistent transaction DAG together with the in-memory unexecuted
//! subgraph and the readiness scheduler that decides, at every state change,
//! exactly which transactions become eligible to execute.
//!
//! The actual replay is an external collaborator: it listens for
//! [`IndexerEvent::ReadyToExecute`], fetches bytes, and calls back with one
//! of [`Indexer::store_executed`], [`Indexer::set_execution_failed`], or
//! [`Indexer::add_missing_deps`].

pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod indexer;
pub mod source;
pub mod tip;
pub mod trust;

pub use config::IndexerConfig;
pub use error::IndexerError;
pub use events::{EventBus, IndexerEvent};
pub use graph::UnexecutedGraph;
pub use indexer::Indexer;
pub use source::{BlockData, ChainSource, Crawler, NextBlock};
pub use trust::TrustRegistry;
