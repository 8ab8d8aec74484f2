//! Storage Nodes
//!
//! A node is a single storage unit holding a keyed set of files. Stores and
//! reads are gated by the node's liveness; failure hides data but never
//! erases it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Liveness of a storage node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Node accepts stores and serves reads
    Active,
    /// Node has failed; its files are retained but hidden
    Down,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Active => write!(f, "Active"),
            NodeStatus::Down => write!(f, "Down"),
        }
    }
}

/// A single storage node
#[derive(Debug, Clone)]
pub struct Node {
    /// Position in the cluster (0-based), fixed at construction
    index: usize,
    /// Display name, e.g. `Node_1`
    name: String,
    /// Current liveness
    status: NodeStatus,
    /// When the status last changed
    status_changed_at: Option<DateTime<Utc>>,
    /// Filename to content
    files: BTreeMap<String, Vec<u8>>,
}

impl Node {
    /// Create a new active node with no files
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            status: NodeStatus::Active,
            status_changed_at: None,
            files: BTreeMap::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    /// Time of the last failure or recovery, `None` if the node never changed state
    pub fn status_changed_at(&self) -> Option<DateTime<Utc>> {
        self.status_changed_at
    }

    /// Store a file, overwriting any previous content under the same name.
    ///
    /// Fails with [`Error::NodeUnavailable`] if the node is down; nothing is
    /// written in that case.
    pub fn store(&mut self, filename: &str, content: &[u8]) -> Result<()> {
        if !self.is_active() {
            tracing::warn!("{} is DOWN. Cannot store '{}'", self.name, filename);
            return Err(Error::NodeUnavailable {
                node: self.name.clone(),
            });
        }

        self.files.insert(filename.to_string(), content.to_vec());
        tracing::info!("{} stored '{}'", self.name, filename);
        Ok(())
    }

    /// Whether the file is held here, regardless of liveness
    pub fn has_file(&self, filename: &str) -> bool {
        self.files.contains_key(filename)
    }

    /// Read a file. Returns `None` both when the node is down and when the
    /// file is missing; check [`Node::is_active`] to tell them apart.
    pub fn read(&self, filename: &str) -> Option<&[u8]> {
        if !self.is_active() {
            return None;
        }
        self.files.get(filename).map(Vec::as_slice)
    }

    /// Filenames held here in sorted order, regardless of liveness
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Raw access for audits; ignores liveness
    pub(crate) fn stored_content(&self, filename: &str) -> Option<&[u8]> {
        self.files.get(filename).map(Vec::as_slice)
    }

    /// Mark the node down. Returns false if it already was.
    pub(crate) fn mark_down(&mut self) -> bool {
        self.set_status(NodeStatus::Down)
    }

    /// Mark the node active. Returns false if it already was.
    pub(crate) fn mark_active(&mut self) -> bool {
        self.set_status(NodeStatus::Active)
    }

    fn set_status(&mut self, status: NodeStatus) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.status_changed_at = Some(Utc::now());
        true
    }
}
