//! WolfStore Configuration
//!
//! This module provides configuration structures for the replicated
//! file store: cluster size, replication factor and logging.

use serde::{Deserialize, Serialize};

/// Main WolfStore configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WolfStoreConfig {
    /// Cluster configuration
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Replication configuration
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of storage nodes, fixed for the lifetime of the cluster
    #[serde(default = "default_nodes")]
    pub nodes: usize,

    /// Prefix for node display names (`Node` gives `Node_1`, `Node_2`, ...)
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

/// Replication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Target number of live replicas per file
    #[serde(default = "default_factor")]
    pub factor: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_nodes() -> usize {
    4
}

fn default_name_prefix() -> String {
    "Node".to_string()
}

fn default_factor() -> usize {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            name_prefix: default_name_prefix(),
        }
    }
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            factor: default_factor(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl WolfStoreConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: WolfStoreConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration back to TOML
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.cluster.nodes == 0 {
            return Err(crate::Error::Config("cluster.nodes must be at least 1".into()));
        }

        if self.cluster.name_prefix.is_empty() {
            return Err(crate::Error::Config("cluster.name_prefix cannot be empty".into()));
        }

        if self.replication.factor == 0 {
            return Err(crate::Error::Config("replication.factor must be at least 1".into()));
        }

        if self.replication.factor > self.cluster.nodes {
            tracing::warn!(
                "replication.factor {} exceeds cluster.nodes {}; every upload will be degraded",
                self.replication.factor,
                self.cluster.nodes
            );
        }

        Ok(())
    }

    /// Display name for the node at a 0-based index
    pub fn node_name(&self, index: usize) -> String {
        format!("{}_{}", self.cluster.name_prefix, index + 1)
    }
}
