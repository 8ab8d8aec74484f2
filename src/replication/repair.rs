//! Fault repair
//!
//! Re-replicates files that have fewer live replicas than the replication
//! factor, copying from the first active holder onto active nodes that lack
//! the file, in index order.

use std::collections::{BTreeMap, BTreeSet};

use super::engine::ReplicationEngine;
use super::report::{FileRepair, RepairReport};

/// Live replica tally for one file
struct Tally {
    copies: usize,
    /// First active holder in index order
    source: usize,
}

impl ReplicationEngine {
    /// Restore replication for every file that still has a live replica.
    ///
    /// Files held only by down nodes cannot be repaired and are listed in
    /// [`RepairReport::unrepairable`]. The pass always completes; files may
    /// remain below the replication factor when too few nodes are active.
    pub fn repair_faults(&mut self) -> RepairReport {
        tracing::info!("Repairing faults (re-replicating lost files)");

        let tally = self.tally_active_replicas();
        let mut report = RepairReport {
            replication_factor: self.replication_factor,
            ..Default::default()
        };

        for (filename, Tally { copies, source }) in tally {
            if copies >= self.replication_factor {
                continue;
            }

            tracing::info!(
                "Re-replicating {} ({}/{})",
                filename,
                copies,
                self.replication_factor
            );

            let content = match self.nodes[source].read(&filename) {
                Some(content) => content.to_vec(),
                None => continue,
            };

            let mut repair = FileRepair {
                filename: filename.clone(),
                source: self.nodes[source].name().to_string(),
                copies_before: copies,
                copies_after: copies,
                targets: Vec::new(),
            };

            for node in self.nodes.iter_mut() {
                if repair.copies_after >= self.replication_factor {
                    break;
                }
                if !node.is_active() || node.has_file(&filename) {
                    continue;
                }
                match node.store(&filename, &content) {
                    Ok(()) => {
                        repair.copies_after += 1;
                        repair.targets.push(node.name().to_string());
                    }
                    Err(e) => tracing::warn!("Repair store on {} failed: {}", node.name(), e),
                }
            }

            if repair.copies_after < self.replication_factor {
                tracing::warn!(
                    "'{}' still under-replicated after repair ({}/{})",
                    filename,
                    repair.copies_after,
                    self.replication_factor
                );
            }

            report.repaired.push(repair);
        }

        report.unrepairable = self.files_without_live_replica();
        for filename in &report.unrepairable {
            tracing::warn!("'{}' has no active replica and cannot be repaired", filename);
        }

        tracing::info!(
            "Fault repair completed: {} files re-replicated, {} new replicas",
            report.repaired.len(),
            report.stores()
        );

        report
    }

    /// Count live replicas per file, remembering the first active holder
    fn tally_active_replicas(&self) -> BTreeMap<String, Tally> {
        let mut tally: BTreeMap<String, Tally> = BTreeMap::new();

        for node in self.nodes.iter().filter(|n| n.is_active()) {
            for filename in node.filenames() {
                tally
                    .entry(filename.to_string())
                    .and_modify(|t| t.copies += 1)
                    .or_insert(Tally {
                        copies: 1,
                        source: node.index(),
                    });
            }
        }

        tracing::debug!("Tallied {} files with live replicas", tally.len());
        tally
    }

    /// Files present somewhere in the cluster but only on down nodes
    fn files_without_live_replica(&self) -> Vec<String> {
        let live: BTreeSet<&str> = self
            .nodes
            .iter()
            .filter(|n| n.is_active())
            .flat_map(|n| n.filenames())
            .collect();

        let hidden: BTreeSet<&str> = self
            .nodes
            .iter()
            .filter(|n| !n.is_active())
            .flat_map(|n| n.filenames())
            .filter(|f| !live.contains(f))
            .collect();

        hidden.into_iter().map(str::to_string).collect()
    }
}
