//! WolfStore - Fault-Tolerant Replicated File Store
//!
//! Runs command scripts against an in-process replicated store and
//! manages its configuration file.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfstore::config::WolfStoreConfig;
use wolfstore::error::Result;
use wolfstore::replication::{ClusterSummary, NodeListing, ReplicationEngine};
use wolfstore::script::ScriptRunner;

/// Script executed by `wolfstore demo`
const DEMO_SCRIPT: &str = "\
# Two replicas on four nodes; lose one and repair
upload a.txt hello
list
fail 1
download a.txt
repair
list
status
";

/// WolfStore - Fault-Tolerant Replicated File Store
#[derive(Parser)]
#[command(name = "wolfstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults are used if it does not exist)
    #[arg(short, long, default_value = "wolfstore.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command script against a fresh cluster
    Run {
        /// Script path, or `-` to read from stdin
        script: PathBuf,

        /// Print the final node listing and summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the built-in single-failure walkthrough
    Demo,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfstore.toml")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Show cluster configuration
    Info,
}

/// Final cluster state printed by `run --json`
#[derive(Serialize)]
struct ClusterReport {
    summary: ClusterSummary,
    nodes: Vec<NodeListing>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { ref output } => return run_init(output),
        Commands::Validate => return run_validate(&cli.config),
        _ => {}
    }

    let config = load_config(&cli.config)?;
    let level = cli.log_level.as_deref().unwrap_or(config.logging.level.as_str());
    init_logging(level, &config.logging.format);

    match cli.command {
        Commands::Run { script, json } => run_script(&config, &script, json),
        Commands::Demo => run_demo(&config),
        Commands::Info => run_info(&config),
        Commands::Init { .. } | Commands::Validate => Ok(()),
    }
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if format == "compact" {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Load the config file, falling back to defaults when it is absent
fn load_config(path: &Path) -> Result<WolfStoreConfig> {
    if path.exists() {
        WolfStoreConfig::from_file(path)
    } else {
        Ok(WolfStoreConfig::default())
    }
}

/// Execute a script file (or stdin) against a fresh cluster
fn run_script(config: &WolfStoreConfig, script: &Path, json: bool) -> Result<()> {
    let source = if script == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(script)?
    };

    let engine = ReplicationEngine::from_config(config)?;
    tracing::info!(
        "Cluster ready: {} nodes, replication factor {}",
        engine.node_count(),
        engine.replication_factor()
    );

    let mut runner = ScriptRunner::new(engine);
    for line in runner.run(&source)? {
        println!("{}", line);
    }

    if json {
        let engine = runner.engine();
        let report = ClusterReport {
            summary: engine.summary(),
            nodes: engine.list_files(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

/// Run the built-in walkthrough
fn run_demo(config: &WolfStoreConfig) -> Result<()> {
    println!("=============================================");
    println!("     WolfStore Replicated File Store");
    println!("     With Fault Tolerance Simulation");
    println!("=============================================");

    let mut runner = ScriptRunner::new(ReplicationEngine::from_config(config)?);
    for line in runner.run(DEMO_SCRIPT)? {
        println!("{}", line);
    }
    Ok(())
}

/// Initialize configuration file
fn run_init(output: &Path) -> Result<()> {
    let config_content = r#"# WolfStore Configuration
# Generated configuration file

[cluster]
nodes = 4
name_prefix = "Node"

[replication]
factor = 2

[logging]
level = "info"
format = "pretty"
"#;

    std::fs::write(output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("Then run a script with: wolfstore --config {} run <script>", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: &Path) -> Result<()> {
    match WolfStoreConfig::from_file(config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Nodes: {}", config.cluster.nodes);
            println!("  Replication Factor: {}", config.replication.factor);
            if config.replication.factor > config.cluster.nodes {
                println!("  ! Replication factor exceeds node count; uploads will be degraded");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show cluster configuration
fn run_info(config: &WolfStoreConfig) -> Result<()> {
    println!("WolfStore Cluster Information");
    println!("=============================");
    println!();
    println!("Nodes:              {}", config.cluster.nodes);
    println!(
        "Node Names:         {} .. {}",
        config.node_name(0),
        config.node_name(config.cluster.nodes.saturating_sub(1))
    );
    println!("Replication Factor: {}", config.replication.factor);
    println!();
    println!("Logging:");
    println!("  Level:            {}", config.logging.level);
    println!("  Format:           {}", config.logging.format);

    Ok(())
}
