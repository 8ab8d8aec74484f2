//! Replication Engine
//!
//! Owns the fixed, ordered node set and the replication factor, and applies
//! the placement, lookup and failure/recovery policies. All scans run in
//! node index order; there is no separate file registry, so replica counts
//! are always derived from the nodes themselves.

use std::collections::BTreeSet;

use crate::config::WolfStoreConfig;
use crate::error::{Error, Result};
use crate::node::{Node, NodeStatus};

use super::report::{ClusterSummary, Download, NodeListing, Transition, UploadReport};

/// Default cluster size
pub const DEFAULT_NODES: usize = 4;

/// Default replication factor
pub const DEFAULT_REPLICATION_FACTOR: usize = 2;

/// Replicated file store over a fixed set of nodes
#[derive(Debug, Clone)]
pub struct ReplicationEngine {
    pub(super) nodes: Vec<Node>,
    pub(super) replication_factor: usize,
}

impl ReplicationEngine {
    /// Create an engine with `node_count` nodes named `Node_1..Node_N`
    pub fn new(node_count: usize, replication_factor: usize) -> Result<Self> {
        Self::with_prefix(node_count, replication_factor, "Node")
    }

    /// Create an engine with a custom node name prefix
    pub fn with_prefix(node_count: usize, replication_factor: usize, prefix: &str) -> Result<Self> {
        if node_count == 0 {
            return Err(Error::Config("cluster needs at least one node".into()));
        }
        if replication_factor == 0 {
            return Err(Error::Config("replication factor must be at least 1".into()));
        }

        let nodes = (0..node_count)
            .map(|i| Node::new(i, format!("{}_{}", prefix, i + 1)))
            .collect();

        tracing::debug!(
            "Created cluster with {} nodes, replication factor {}",
            node_count,
            replication_factor
        );

        Ok(Self {
            nodes,
            replication_factor,
        })
    }

    /// Create an engine from configuration
    pub fn from_config(config: &WolfStoreConfig) -> Result<Self> {
        config.validate()?;
        Self::with_prefix(
            config.cluster.nodes,
            config.replication.factor,
            &config.cluster.name_prefix,
        )
    }

    pub fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn active_node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_active()).count()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Result<&Node> {
        self.nodes.get(index).ok_or(Error::InvalidIndex {
            index,
            nodes: self.nodes.len(),
        })
    }

    /// Translate a 1-based node number into a 0-based index
    pub fn index_for_number(&self, number: usize) -> Result<usize> {
        if number == 0 || number > self.nodes.len() {
            return Err(Error::InvalidIndex {
                index: number,
                nodes: self.nodes.len(),
            });
        }
        Ok(number - 1)
    }

    /// Place a file on the first R active nodes in index order.
    ///
    /// With fewer than R active nodes the file goes to all of them and the
    /// report is marked degraded. Replicas on nodes not selected this time
    /// are left untouched, even if their content is now stale.
    pub fn upload(&mut self, filename: &str, content: &[u8]) -> UploadReport {
        tracing::info!("Uploading file: {}", filename);

        let mut stored_on = Vec::new();
        for node in self.nodes.iter_mut() {
            if stored_on.len() >= self.replication_factor {
                break;
            }
            if !node.is_active() {
                continue;
            }
            match node.store(filename, content) {
                Ok(()) => stored_on.push(node.name().to_string()),
                Err(e) => tracing::warn!("Store on {} failed: {}", node.name(), e),
            }
        }

        let report = UploadReport {
            filename: filename.to_string(),
            stored_on,
            replication_factor: self.replication_factor,
        };

        if report.is_degraded() {
            tracing::warn!(
                "Not enough active nodes for full replication of '{}' ({}/{})",
                filename,
                report.replicas(),
                self.replication_factor
            );
        }

        report
    }

    /// Read a file from the lowest-index active node holding it
    pub fn download(&self, filename: &str) -> Result<Download> {
        for node in &self.nodes {
            if let Some(content) = node.read(filename) {
                tracing::info!("File '{}' retrieved from {}", filename, node.name());
                return Ok(Download {
                    filename: filename.to_string(),
                    node_index: node.index(),
                    node: node.name().to_string(),
                    content: content.to_vec(),
                });
            }
        }

        tracing::warn!("File '{}' not available (all replicas lost or nodes down)", filename);
        Err(Error::FileUnavailable(filename.to_string()))
    }

    /// Mark a node down. Its files are kept but hidden until recovery.
    pub fn fail_node(&mut self, index: usize) -> Result<Transition> {
        let node = self.node_mut(index)?;
        let name = node.name().to_string();

        if !node.mark_down() {
            tracing::warn!("{} is already down", name);
            return Ok(Transition::Unchanged {
                node: name,
                status: NodeStatus::Down,
            });
        }

        tracing::info!("{} has FAILED", name);
        Ok(Transition::Changed {
            node: name,
            status: NodeStatus::Down,
        })
    }

    /// Bring a node back. Whatever it held before failing becomes visible
    /// again as-is; missed updates are not reconciled.
    pub fn recover_node(&mut self, index: usize) -> Result<Transition> {
        let node = self.node_mut(index)?;
        let name = node.name().to_string();

        if !node.mark_active() {
            tracing::warn!("{} is already active", name);
            return Ok(Transition::Unchanged {
                node: name,
                status: NodeStatus::Active,
            });
        }

        tracing::info!("{} is RECOVERED ({} files)", name, node.file_count());
        Ok(Transition::Changed {
            node: name,
            status: NodeStatus::Active,
        })
    }

    /// Status and filenames of every node, in index order
    pub fn list_files(&self) -> Vec<NodeListing> {
        self.nodes
            .iter()
            .map(|node| NodeListing {
                index: node.index(),
                name: node.name().to_string(),
                status: node.status(),
                files: node.filenames().map(str::to_string).collect(),
                status_changed_at: node.status_changed_at(),
            })
            .collect()
    }

    /// Every filename held by any node, active or down, sorted
    pub fn filenames(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.nodes.iter().flat_map(|n| n.filenames()).collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Indices of active nodes holding the file, in index order
    pub fn replica_holders(&self, filename: &str) -> Vec<usize> {
        self.nodes
            .iter()
            .filter(|n| n.is_active() && n.has_file(filename))
            .map(Node::index)
            .collect()
    }

    /// Number of live replicas of a file
    pub fn active_replica_count(&self, filename: &str) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.is_active() && n.has_file(filename))
            .count()
    }

    /// Get cluster summary
    pub fn summary(&self) -> ClusterSummary {
        let active_nodes = self.active_node_count();
        let mut summary = ClusterSummary {
            total_nodes: self.nodes.len(),
            active_nodes,
            down_nodes: self.nodes.len() - active_nodes,
            replication_factor: self.replication_factor,
            files: 0,
            under_replicated: 0,
            unavailable: 0,
        };

        for filename in self.filenames() {
            summary.files += 1;
            match self.active_replica_count(&filename) {
                0 => summary.unavailable += 1,
                n if n < self.replication_factor => summary.under_replicated += 1,
                _ => {}
            }
        }

        summary
    }

    fn node_mut(&mut self, index: usize) -> Result<&mut Node> {
        let nodes = self.nodes.len();
        self.nodes
            .get_mut(index)
            .ok_or(Error::InvalidIndex { index, nodes })
    }
}

impl Default for ReplicationEngine {
    fn default() -> Self {
        let nodes = (0..DEFAULT_NODES)
            .map(|i| Node::new(i, format!("Node_{}", i + 1)))
            .collect();
        Self {
            nodes,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holders(engine: &ReplicationEngine, filename: &str) -> Vec<usize> {
        engine
            .nodes()
            .iter()
            .filter(|n| n.has_file(filename))
            .map(Node::index)
            .collect()
    }

    #[test]
    fn test_new_rejects_empty_cluster_and_zero_factor() {
        assert!(matches!(ReplicationEngine::new(0, 2), Err(Error::Config(_))));
        assert!(matches!(ReplicationEngine::new(4, 0), Err(Error::Config(_))));
    }

    #[test]
    fn test_default_cluster() {
        let engine = ReplicationEngine::default();
        assert_eq!(engine.node_count(), 4);
        assert_eq!(engine.replication_factor(), 2);
        assert_eq!(engine.nodes()[0].name(), "Node_1");
        assert_eq!(engine.nodes()[3].name(), "Node_4");
    }

    #[test]
    fn test_from_config() {
        let config = WolfStoreConfig::from_str("[cluster]\nnodes = 3\nname_prefix = \"Disk\"\n").unwrap();
        let engine = ReplicationEngine::from_config(&config).unwrap();
        assert_eq!(engine.node_count(), 3);
        assert_eq!(engine.nodes()[2].name(), "Disk_3");
    }

    #[test]
    fn test_upload_places_on_first_r_active_nodes() {
        let mut engine = ReplicationEngine::new(4, 2).unwrap();
        let report = engine.upload("a.txt", b"hello");

        assert_eq!(report.stored_on, vec!["Node_1", "Node_2"]);
        assert!(!report.is_degraded());
        assert_eq!(holders(&engine, "a.txt"), vec![0, 1]);
    }

    #[test]
    fn test_upload_skips_down_nodes() {
        let mut engine = ReplicationEngine::new(4, 2).unwrap();
        engine.fail_node(0).unwrap();
        engine.fail_node(2).unwrap();

        let report = engine.upload("a.txt", b"hello");
        assert_eq!(report.stored_on, vec!["Node_2", "Node_4"]);
        assert_eq!(holders(&engine, "a.txt"), vec![1, 3]);
    }

    #[test]
    fn test_upload_with_too_few_active_nodes_is_degraded() {
        let mut engine = ReplicationEngine::new(4, 3).unwrap();
        engine.fail_node(0).unwrap();
        engine.fail_node(1).unwrap();

        let report = engine.upload("a.txt", b"hello");
        assert!(report.is_degraded());
        assert_eq!(report.replicas(), 2);
        assert_eq!(holders(&engine, "a.txt"), vec![2, 3]);
    }

    #[test]
    fn test_upload_with_no_active_nodes() {
        let mut engine = ReplicationEngine::new(2, 2).unwrap();
        engine.fail_node(0).unwrap();
        engine.fail_node(1).unwrap();

        let report = engine.upload("a.txt", b"hello");
        assert!(report.is_degraded());
        assert_eq!(report.replicas(), 0);
        assert!(engine.filenames().is_empty());
    }

    #[test]
    fn test_reupload_leaves_stale_replicas() {
        let mut engine = ReplicationEngine::new(4, 2).unwrap();
        engine.upload("a.txt", b"v1");
        engine.fail_node(0).unwrap();
        engine.upload("a.txt", b"v2");

        // Node_2 and Node_3 got v2; Node_1 still holds v1 while down
        assert_eq!(holders(&engine, "a.txt"), vec![0, 1, 2]);

        engine.recover_node(0).unwrap();
        let download = engine.download("a.txt").unwrap();
        assert_eq!(download.node, "Node_1");
        assert_eq!(download.content, b"v1");
    }

    #[test]
    fn test_download_prefers_lowest_index_active_holder() {
        let mut engine = ReplicationEngine::new(4, 2).unwrap();
        engine.upload("a.txt", b"hello");

        let download = engine.download("a.txt").unwrap();
        assert_eq!(download.node_index, 0);
        assert_eq!(download.content_lossy(), "hello");

        engine.fail_node(0).unwrap();
        let download = engine.download("a.txt").unwrap();
        assert_eq!(download.node, "Node_2");
    }

    #[test]
    fn test_download_unavailable() {
        let mut engine = ReplicationEngine::new(4, 2).unwrap();
        let err = engine.download("missing.txt").unwrap_err();
        assert!(err.is_not_found());

        engine.upload("a.txt", b"hello");
        engine.fail_node(0).unwrap();
        engine.fail_node(1).unwrap();
        assert!(matches!(engine.download("a.txt"), Err(Error::FileUnavailable(f)) if f == "a.txt"));
    }

    #[test]
    fn test_fail_and_recover_transitions() {
        let mut engine = ReplicationEngine::new(4, 2).unwrap();

        let t = engine.fail_node(1).unwrap();
        assert!(t.is_changed());
        assert_eq!(t.node(), "Node_2");
        assert_eq!(t.status(), NodeStatus::Down);

        let t = engine.fail_node(1).unwrap();
        assert!(!t.is_changed());

        let t = engine.recover_node(1).unwrap();
        assert!(t.is_changed());
        assert_eq!(t.status(), NodeStatus::Active);

        let t = engine.recover_node(1).unwrap();
        assert_eq!(
            t,
            Transition::Unchanged {
                node: "Node_2".into(),
                status: NodeStatus::Active
            }
        );
    }

    #[test]
    fn test_out_of_range_index_is_reported() {
        let mut engine = ReplicationEngine::new(4, 2).unwrap();
        assert!(matches!(
            engine.fail_node(4),
            Err(Error::InvalidIndex { index: 4, nodes: 4 })
        ));
        assert!(matches!(
            engine.recover_node(10),
            Err(Error::InvalidIndex { index: 10, nodes: 4 })
        ));
        assert_eq!(engine.active_node_count(), 4);
    }

    #[test]
    fn test_index_for_number() {
        let engine = ReplicationEngine::new(4, 2).unwrap();
        assert_eq!(engine.index_for_number(1).unwrap(), 0);
        assert_eq!(engine.index_for_number(4).unwrap(), 3);
        assert!(engine.index_for_number(0).is_err());
        assert!(engine.index_for_number(5).is_err());
    }

    #[test]
    fn test_failure_cycle_preserves_file_set() {
        let mut engine = ReplicationEngine::new(4, 2).unwrap();
        engine.upload("a.txt", b"1");
        engine.upload("b.txt", b"2");

        let before = engine.list_files()[0].files.clone();
        engine.fail_node(0).unwrap();
        engine.recover_node(0).unwrap();
        let after = engine.list_files()[0].files.clone();

        assert_eq!(before, after);
        assert_eq!(after, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_list_files_shows_down_nodes_with_their_files() {
        let mut engine = ReplicationEngine::new(3, 2).unwrap();
        engine.upload("a.txt", b"hello");
        engine.fail_node(0).unwrap();

        let listing = engine.list_files();
        assert_eq!(listing.len(), 3);
        assert_eq!(listing[0].status, NodeStatus::Down);
        assert_eq!(listing[0].files, vec!["a.txt"]);
        assert!(listing[0].status_changed_at.is_some());
        assert!(listing[2].files.is_empty());
    }

    #[test]
    fn test_replica_queries_and_summary() {
        let mut engine = ReplicationEngine::new(4, 2).unwrap();
        engine.upload("a.txt", b"1");
        engine.fail_node(1).unwrap();
        engine.fail_node(2).unwrap();
        engine.upload("b.txt", b"2");

        assert_eq!(engine.replica_holders("a.txt"), vec![0]);
        assert_eq!(engine.active_replica_count("b.txt"), 2);

        engine.fail_node(0).unwrap();
        let summary = engine.summary();
        assert_eq!(summary.total_nodes, 4);
        assert_eq!(summary.active_nodes, 1);
        assert_eq!(summary.down_nodes, 3);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.unavailable, 1);
        assert_eq!(summary.under_replicated, 1);
    }
}
