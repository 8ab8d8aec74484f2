//! Batch Scripts
//!
//! Plain-text command scripts driven against a [`ReplicationEngine`], one
//! command per line. Node numbers are 1-based as seen by operators.
//!
//! ```text
//! # comments and blank lines are ignored
//! upload a.txt hello world
//! fail 1
//! download a.txt
//! repair
//! list
//! ```

use crate::error::{Error, Result};
use crate::replication::{ReplicationEngine, Transition};

/// A single script command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload { filename: String, content: String },
    Download { filename: String },
    Fail { node: usize },
    Recover { node: usize },
    Repair,
    List,
    Status,
    Audit,
}

impl Command {
    /// Parse one non-empty, non-comment line
    pub fn parse(line: &str, line_no: usize) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let err = |reason: String| Error::Script {
            line: line_no,
            reason,
        };

        match verb.to_ascii_lowercase().as_str() {
            "upload" => {
                let (filename, content) = match rest.split_once(char::is_whitespace) {
                    Some((f, c)) => (f, c.trim()),
                    None => (rest, ""),
                };
                if filename.is_empty() {
                    return Err(err("upload needs a filename".into()));
                }
                Ok(Command::Upload {
                    filename: filename.to_string(),
                    content: content.to_string(),
                })
            }
            "download" => {
                if rest.is_empty() || rest.contains(char::is_whitespace) {
                    return Err(err("download takes exactly one filename".into()));
                }
                Ok(Command::Download {
                    filename: rest.to_string(),
                })
            }
            "fail" | "recover" => {
                let node: usize = rest
                    .parse()
                    .map_err(|_| err(format!("{} needs a node number, got '{}'", verb, rest)))?;
                if verb.eq_ignore_ascii_case("fail") {
                    Ok(Command::Fail { node })
                } else {
                    Ok(Command::Recover { node })
                }
            }
            "repair" | "list" | "status" | "audit" if !rest.is_empty() => {
                Err(err(format!("{} takes no arguments", verb)))
            }
            "repair" => Ok(Command::Repair),
            "list" => Ok(Command::List),
            "status" => Ok(Command::Status),
            "audit" => Ok(Command::Audit),
            other => Err(err(format!("unknown command '{}'", other))),
        }
    }
}

/// Parse a whole script, skipping blank lines and `#` comments
pub fn parse_script(source: &str) -> Result<Vec<Command>> {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| Command::parse(line, line_no))
        .collect()
}

/// Executes commands and renders their results as text
pub struct ScriptRunner {
    engine: ReplicationEngine,
}

impl ScriptRunner {
    pub fn new(engine: ReplicationEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ReplicationEngine {
        &self.engine
    }

    pub fn into_engine(self) -> ReplicationEngine {
        self.engine
    }

    /// Parse and run a script. Parsing happens up front so a malformed
    /// script runs nothing.
    pub fn run(&mut self, source: &str) -> Result<Vec<String>> {
        let commands = parse_script(source)?;
        tracing::debug!("Running script with {} commands", commands.len());

        let mut output = Vec::new();
        for command in &commands {
            output.extend(self.execute(command));
        }
        Ok(output)
    }

    /// Run one command. Engine errors are rendered into the output rather
    /// than aborting the script.
    pub fn execute(&mut self, command: &Command) -> Vec<String> {
        match command {
            Command::Upload { filename, content } => {
                let report = self.engine.upload(filename, content.as_bytes());
                let mut out = vec![format!("Uploading file: {}...", filename)];
                out.extend(report.stored_on.iter().map(|n| format!("{} stored '{}'", n, filename)));
                if report.is_degraded() {
                    out.push(format!(
                        "Warning: Not enough active nodes for full replication ({}/{}).",
                        report.replicas(),
                        report.replication_factor
                    ));
                }
                out
            }
            Command::Download { filename } => {
                let mut out = vec![format!("Downloading '{}'...", filename)];
                match self.engine.download(filename) {
                    Ok(d) => out.push(format!("File retrieved from {} : {}", d.node, d.content_lossy())),
                    Err(e) if e.is_not_found() => {
                        out.push("File not available (all replicas lost or nodes down).".into())
                    }
                    Err(e) => out.push(format!("Error: {}", e)),
                }
                out
            }
            Command::Fail { node } => {
                let result = self
                    .engine
                    .index_for_number(*node)
                    .and_then(|i| self.engine.fail_node(i));
                vec![match result {
                    Ok(Transition::Changed { node, .. }) => format!("{} has FAILED.", node),
                    Ok(Transition::Unchanged { node, .. }) => format!("{} is already down.", node),
                    Err(e) => format!("Error: {}", e),
                }]
            }
            Command::Recover { node } => {
                let result = self
                    .engine
                    .index_for_number(*node)
                    .and_then(|i| self.engine.recover_node(i));
                vec![match result {
                    Ok(Transition::Changed { node, .. }) => format!("{} is RECOVERED.", node),
                    Ok(Transition::Unchanged { node, .. }) => format!("{} is already active.", node),
                    Err(e) => format!("Error: {}", e),
                }]
            }
            Command::Repair => {
                let report = self.engine.repair_faults();
                let mut out = vec!["Repairing Faults (Re-replicating lost files)...".to_string()];
                for repair in &report.repaired {
                    out.push(format!(
                        "Re-replicating {} ({}/{})",
                        repair.filename, repair.copies_before, report.replication_factor
                    ));
                    out.extend(
                        repair
                            .targets
                            .iter()
                            .map(|t| format!("{} stored '{}'", t, repair.filename)),
                    );
                }
                for filename in &report.unrepairable {
                    out.push(format!("Cannot repair {}: no active replica", filename));
                }
                out.push("Fault repair completed.".into());
                out
            }
            Command::List => {
                let mut out = vec!["File Distribution:".to_string()];
                for node in self.engine.list_files() {
                    let files = if node.files.is_empty() {
                        "[Empty]".to_string()
                    } else {
                        node.files.join(" ")
                    };
                    out.push(format!("{} ({}): {}", node.name, node.status, files));
                }
                out
            }
            Command::Status => {
                let s = self.engine.summary();
                vec![format!(
                    "Nodes: {}/{} active, R={}, files: {}, under-replicated: {}, unavailable: {}",
                    s.active_nodes,
                    s.total_nodes,
                    s.replication_factor,
                    s.files,
                    s.under_replicated,
                    s.unavailable
                )]
            }
            Command::Audit => {
                let divergent = self.engine.audit();
                if divergent.is_empty() {
                    return vec!["All replicas consistent.".into()];
                }
                let mut out = Vec::new();
                for file in divergent {
                    out.push(format!("Replicas of '{}' diverge:", file.filename));
                    out.extend(file.replicas.iter().map(|r| {
                        format!("  {} ({}): {}", r.node, r.status, r.short_digest())
                    }));
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("upload a.txt hello world", 1).unwrap(),
            Command::Upload {
                filename: "a.txt".into(),
                content: "hello world".into()
            }
        );
        assert_eq!(
            Command::parse("upload empty.txt", 1).unwrap(),
            Command::Upload {
                filename: "empty.txt".into(),
                content: String::new()
            }
        );
        assert_eq!(Command::parse("FAIL 2", 1).unwrap(), Command::Fail { node: 2 });
        assert_eq!(Command::parse("recover 3", 1).unwrap(), Command::Recover { node: 3 });
        assert_eq!(Command::parse("repair", 1).unwrap(), Command::Repair);
        assert_eq!(Command::parse("  list  ", 1).unwrap(), Command::List);
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let err = Command::parse("fail one", 7).unwrap_err();
        assert!(matches!(err, Error::Script { line: 7, .. }));
        assert!(err.is_caller_error());

        assert!(Command::parse("explode", 1).is_err());
        assert!(Command::parse("download", 1).is_err());
        assert!(Command::parse("download a b", 1).is_err());
        assert!(Command::parse("repair now", 1).is_err());
        assert!(Command::parse("upload", 1).is_err());
    }

    #[test]
    fn test_parse_script_skips_comments_and_blank_lines() {
        let script = "# setup\n\nupload a.txt hi\n  # indented comment\nlist\n";
        let commands = parse_script(script).unwrap();
        assert_eq!(commands.len(), 2);

        let err = parse_script("list\n\nbogus\n").unwrap_err();
        assert!(matches!(err, Error::Script { line: 3, .. }));
    }

    #[test]
    fn test_run_scenario_script() {
        let mut runner = ScriptRunner::new(ReplicationEngine::default());
        let output = runner
            .run(
                "upload a.txt hello\n\
                 fail 1\n\
                 download a.txt\n\
                 repair\n\
                 list\n",
            )
            .unwrap();

        assert!(output.contains(&"Node_1 stored 'a.txt'".to_string()));
        assert!(output.contains(&"Node_1 has FAILED.".to_string()));
        assert!(output.contains(&"File retrieved from Node_2 : hello".to_string()));
        assert!(output.contains(&"Re-replicating a.txt (1/2)".to_string()));
        assert!(output.contains(&"Node_3 stored 'a.txt'".to_string()));
        assert!(output.contains(&"Node_1 (Down): a.txt".to_string()));
        assert!(output.contains(&"Node_4 (Active): [Empty]".to_string()));
    }

    #[test]
    fn test_errors_do_not_stop_the_script() {
        let mut runner = ScriptRunner::new(ReplicationEngine::default());
        let output = runner.run("fail 9\nfail 0\nfail 2\nfail 2\nrecover 2\nrecover 2\n").unwrap();

        assert_eq!(
            output,
            vec![
                "Error: Invalid node index 9 (cluster has 4 nodes)",
                "Error: Invalid node index 0 (cluster has 4 nodes)",
                "Node_2 has FAILED.",
                "Node_2 is already down.",
                "Node_2 is RECOVERED.",
                "Node_2 is already active.",
            ]
        );
    }

    #[test]
    fn test_degraded_upload_and_missing_download() {
        let engine = ReplicationEngine::new(2, 3).unwrap();
        let mut runner = ScriptRunner::new(engine);
        let output = runner.run("upload a.txt x\ndownload nope.txt\n").unwrap();

        assert!(output
            .iter()
            .any(|l| l.starts_with("Warning: Not enough active nodes")));
        assert_eq!(
            output.last().unwrap(),
            "File not available (all replicas lost or nodes down)."
        );
    }

    #[test]
    fn test_malformed_script_runs_nothing() {
        let mut runner = ScriptRunner::new(ReplicationEngine::default());
        assert!(runner.run("upload a.txt hi\nwat\n").is_err());
        assert!(runner.engine().filenames().is_empty());
    }

    #[test]
    fn test_status_and_audit_output() {
        let mut runner = ScriptRunner::new(ReplicationEngine::default());
        let output = runner
            .run("upload a.txt v1\nfail 1\nupload a.txt v2\nstatus\naudit\n")
            .unwrap();

        assert!(output.iter().any(|l| l.starts_with("Nodes: 3/4 active, R=2, files: 1")));
        assert!(output.contains(&"Replicas of 'a.txt' diverge:".to_string()));
        assert!(output.iter().any(|l| l.starts_with("  Node_1 (Down): ")));
    }
}
