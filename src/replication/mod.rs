//! Replication Module
//!
//! Placement, lookup, failure handling and repair of file replicas across
//! the cluster's nodes.

mod audit;
mod engine;
mod repair;
pub mod report;

pub use engine::{ReplicationEngine, DEFAULT_NODES, DEFAULT_REPLICATION_FACTOR};
pub use report::{
    ClusterSummary, Download, FileRepair, NodeListing, RepairReport, ReplicaDigest,
    ReplicaDivergence, Transition, UploadReport,
};
