//! WolfStore - Fault-Tolerant Replicated File Store
//!
//! An in-process model of a small replicated file store. A fixed set of
//! storage nodes holds replicas of uploaded files; nodes can be failed and
//! recovered, and a repair pass restores the replication factor from
//! surviving copies.
//!
//! # Architecture
//!
//! - [`node::Node`] holds a keyed set of files and gates stores and reads on
//!   its liveness. Failing a node hides its data without erasing it.
//! - [`replication::ReplicationEngine`] owns the ordered node set and the
//!   replication factor. Placement, lookup and repair all scan nodes in
//!   index order, so replica selection is deterministic.
//!
//! Everything is synchronous and single-threaded: mutating operations take
//! `&mut self` and run to completion.
//!
//! # Features
//!
//! - First-R-active placement with degraded-upload reporting
//! - Lowest-index live replica lookup
//! - Node failure and recovery with data retained across the cycle
//! - Repair of under-replicated files from the first live holder
//! - Replica audit to surface stale content resurrected by recovery
//! - Batch scripts for driving the engine from the CLI

pub mod config;
pub mod error;
pub mod node;
pub mod replication;
pub mod script;

pub use config::WolfStoreConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::WolfStoreConfig;
    pub use crate::error::{Error, Result};
    pub use crate::node::{Node, NodeStatus};
    pub use crate::replication::{
        ClusterSummary, Download, RepairReport, ReplicationEngine, Transition, UploadReport,
    };
    pub use crate::script::{Command, ScriptRunner};
}
