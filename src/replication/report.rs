//! Operation reports
//!
//! Values returned by engine operations. Degraded outcomes are carried here
//! instead of as errors so callers inspect them explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::NodeStatus;

/// Result of placing a file on the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    pub filename: String,
    /// Names of the nodes that stored the file, in index order
    pub stored_on: Vec<String>,
    /// Target replica count at the time of the upload
    pub replication_factor: usize,
}

impl UploadReport {
    pub fn replicas(&self) -> usize {
        self.stored_on.len()
    }

    /// Fewer replicas were placed than the replication factor asks for
    pub fn is_degraded(&self) -> bool {
        self.stored_on.len() < self.replication_factor
    }
}

/// A file served from a live replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    /// Index of the serving node
    pub node_index: usize,
    /// Name of the serving node
    pub node: String,
    pub content: Vec<u8>,
}

impl Download {
    /// Content as text, replacing invalid UTF-8
    pub fn content_lossy(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Outcome of a failure or recovery request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The node changed state
    Changed { node: String, status: NodeStatus },
    /// The node was already in the requested state
    Unchanged { node: String, status: NodeStatus },
}

impl Transition {
    pub fn is_changed(&self) -> bool {
        matches!(self, Transition::Changed { .. })
    }

    pub fn node(&self) -> &str {
        match self {
            Transition::Changed { node, .. } | Transition::Unchanged { node, .. } => node,
        }
    }

    /// Status of the node after the request
    pub fn status(&self) -> NodeStatus {
        match self {
            Transition::Changed { status, .. } | Transition::Unchanged { status, .. } => *status,
        }
    }
}

/// One node's entry in the file distribution listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeListing {
    pub index: usize,
    pub name: String,
    pub status: NodeStatus,
    /// Filenames held, sorted, including those hidden while down
    pub files: Vec<String>,
    pub status_changed_at: Option<DateTime<Utc>>,
}

/// Cluster-wide replication summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub total_nodes: usize,
    pub active_nodes: usize,
    pub down_nodes: usize,
    pub replication_factor: usize,
    /// Distinct filenames on any node
    pub files: usize,
    /// Files with at least one but fewer than R live replicas
    pub under_replicated: usize,
    /// Files with no live replica
    pub unavailable: usize,
}

/// Re-replication performed for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRepair {
    pub filename: String,
    /// Node the content was copied from
    pub source: String,
    pub copies_before: usize,
    pub copies_after: usize,
    /// Nodes that received a new replica, in index order
    pub targets: Vec<String>,
}

/// Result of a repair pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub replication_factor: usize,
    /// Files that were below the replication factor, in filename order
    pub repaired: Vec<FileRepair>,
    /// Files present only on down nodes; no live source exists
    pub unrepairable: Vec<String>,
}

impl RepairReport {
    /// Total replicas written during the pass
    pub fn stores(&self) -> usize {
        self.repaired.iter().map(|r| r.targets.len()).sum()
    }

    /// Files still below the replication factor after the pass
    pub fn still_degraded(&self) -> impl Iterator<Item = &FileRepair> {
        let factor = self.replication_factor;
        self.repaired.iter().filter(move |r| r.copies_after < factor)
    }
}

/// One replica's fingerprint in an audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaDigest {
    pub node: String,
    pub status: NodeStatus,
    /// Hex-encoded SHA-256 of the replica content
    pub digest: String,
}

impl ReplicaDigest {
    pub fn short_digest(&self) -> &str {
        &self.digest[..self.digest.len().min(12)]
    }
}

/// A file whose replicas do not all hold the same content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaDivergence {
    pub filename: String,
    pub replicas: Vec<ReplicaDigest>,
}
