mod edit;
mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hrflow_core::catalog::ActionCatalog;
use hrflow_core::config::AppConfig;
use hrflow_core::error::HrflowError;
use hrflow_core::event::EventBus;
use hrflow_core::types::{NodeKind, Position, SimulationEvent};
use hrflow_graph::{validate, GraphStore, NodeChange, NodeTemplate, Simulator};

#[derive(Parser)]
#[command(name = "hrflow", version, about = "Design, check and dry-run HR workflows")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "hrflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty workflow document
    New {
        /// Workflow file to create
        file: PathBuf,
        /// Workflow name (defaults to the configured name)
        #[arg(long)]
        name: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Add a node and print its id
    Add {
        file: PathBuf,
        /// Node kind: start, task, approval, automated, end
        kind: NodeKind,
        /// Title for the new node
        #[arg(long)]
        title: Option<String>,
        /// Canvas x coordinate (random when omitted)
        #[arg(long, requires = "y", allow_negative_numbers = true)]
        x: Option<f64>,
        /// Canvas y coordinate (random when omitted)
        #[arg(long, requires = "x", allow_negative_numbers = true)]
        y: Option<f64>,
    },
    /// Connect two nodes and print the edge id
    Connect {
        file: PathBuf,
        source: String,
        target: String,
    },
    /// Merge attributes into a node
    Update {
        file: PathBuf,
        /// Node id
        id: String,
        /// Attribute assignment, e.g. --set assignee=Alice --set autoApproveThreshold=48
        #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
        set: Vec<String>,
    },
    /// Delete a node and every edge touching it
    Delete { file: PathBuf, id: String },
    /// Remove an edge
    Disconnect {
        file: PathBuf,
        /// Edge id
        id: String,
    },
    /// Move a node on the canvas
    Move {
        file: PathBuf,
        id: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Remove all nodes and edges
    Clear {
        file: PathBuf,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Print the workflow
    Show {
        file: PathBuf,
        /// Print the raw document
        #[arg(long)]
        json: bool,
    },
    /// Check the workflow structure
    Validate {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Dry-run the workflow
    Simulate {
        file: PathBuf,
        /// No pauses between steps
        #[arg(long)]
        fast: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Simulate even when validation reports errors
        #[arg(long)]
        skip_validation: bool,
    },
    /// List the automated actions available to automated nodes
    Actions {
        #[arg(long)]
        json: bool,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "hrflow", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config)?;

    let default_filter = config
        .log
        .filter
        .clone()
        .unwrap_or_else(|| "hrflow=info,warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let catalog = Arc::new(ActionCatalog::from_config(&config.catalog));

    match cli.command {
        Commands::New { file, name, force } => {
            if file.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    file.display()
                );
            }
            let store = GraphStore::new(name.unwrap_or_else(|| config.workflow.name.clone()));
            edit::save(&file, &store)?;
            println!("{}", store.workflow_id());
        }
        Commands::Add {
            file,
            kind,
            title,
            x,
            y,
        } => {
            let mut store = edit::load(&file)?;
            let mut template = NodeTemplate::new(kind);
            if let Some(title) = title {
                template = template.with_label(title);
            }
            let position = x.zip(y).map(|(x, y)| Position::new(x, y));
            let node = store.add_from_template(&template, position);
            edit::save(&file, &store)?;
            println!("{}", node.id);
        }
        Commands::Connect {
            file,
            source,
            target,
        } => {
            let mut store = edit::load(&file)?;
            let edge = store.connect(&source, &target);
            edit::save(&file, &store)?;
            println!("{}", edge.id);
        }
        Commands::Update { file, id, set } => {
            let mut store = edit::load(&file)?;
            let patch = edit::parse_assignments(&set)?;
            if !store.update_node(&id, &patch)? {
                anyhow::bail!("no node with id '{}'", id);
            }
            edit::save(&file, &store)?;
        }
        Commands::Delete { file, id } => {
            let mut store = edit::load(&file)?;
            if !store.delete_node(&id) {
                anyhow::bail!("no node with id '{}'", id);
            }
            edit::save(&file, &store)?;
        }
        Commands::Disconnect { file, id } => {
            let mut store = edit::load(&file)?;
            if !store.remove_edge(&id) {
                anyhow::bail!("no edge with id '{}'", id);
            }
            edit::save(&file, &store)?;
        }
        Commands::Move { file, id, x, y } => {
            let mut store = edit::load(&file)?;
            if store.node(&id).is_none() {
                anyhow::bail!("no node with id '{}'", id);
            }
            store.apply_node_changes(vec![NodeChange::Position {
                id,
                position: Position::new(x, y),
            }]);
            edit::save(&file, &store)?;
        }
        Commands::Clear { file, yes } => {
            let mut store = edit::load(&file)?;
            let cleared = store.clear(|s| {
                yes || dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Remove all {} nodes and {} edges from '{}'?",
                        s.nodes().len(),
                        s.edges().len(),
                        s.name()
                    ))
                    .default(false)
                    .interact()
                    .unwrap_or(false)
            });
            if cleared {
                edit::save(&file, &store)?;
            } else {
                println!("Nothing changed.");
            }
        }
        Commands::Show { file, json } => {
            let store = edit::load(&file)?;
            if json {
                println!("{}", hrflow_graph::to_json(&store.to_document())?);
            } else {
                report::print_workflow(&store);
            }
        }
        Commands::Validate { file, json } => {
            let store = edit::load(&file)?;
            let result = validate(store.nodes(), store.edges());
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                report::print_validation(&result);
            }
            if !result.is_valid() {
                anyhow::bail!("workflow has {} validation errors", result.errors.len());
            }
        }
        Commands::Simulate {
            file,
            fast,
            json,
            skip_validation,
        } => {
            let store = edit::load(&file)?;
            let workflow = store.to_document();

            // Findings go to stderr when stdout carries JSON
            let findings = validate(store.nodes(), store.edges());
            if json {
                report::preflight(&mut std::io::stderr(), &findings, skip_validation)?;
            } else {
                report::preflight(&mut std::io::stdout(), &findings, skip_validation)?;
            }

            let event_bus = Arc::new(EventBus::default());
            let mut simulator = Simulator::from_config(catalog.clone(), &config.simulator)
                .with_event_bus(event_bus.clone());
            if fast {
                simulator = simulator.with_delays(Duration::ZERO, Duration::ZERO);
            }

            let cancel = CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Cancel the run on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Cancelling simulation...");
                cancel_clone.cancel();
            });

            // Spawn event printer
            let mut rx = event_bus.subscribe();
            let print_handle = tokio::spawn(async move {
                loop {
                    let event = match rx.recv().await {
                        Ok(event) => event,
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    };
                    match event {
                        SimulationEvent::Started { workflow_name, .. } => {
                            if !json {
                                println!("Simulating {}", workflow_name);
                                println!();
                            }
                        }
                        SimulationEvent::Step(step) => {
                            if !json {
                                report::print_step(&step);
                            }
                        }
                        SimulationEvent::Finished(_) | SimulationEvent::Failed { .. } => break,
                    }
                }
            });

            let outcome = simulator.run(&workflow, &cancel).await;
            print_handle.await.ok();

            match outcome {
                Ok(result) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&result)?);
                    } else {
                        report::print_summary(&result);
                    }
                }
                Err(HrflowError::Cancelled) => {
                    eprintln!("Simulation cancelled.");
                    std::process::exit(130);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Actions { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.list())?);
            } else {
                report::print_actions(&catalog);
            }
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

/// `--config` if it exists, then `~/.hrflow/config.toml`, then defaults.
fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        return Ok(AppConfig::load(path)?);
    }
    if let Some(home_config) = AppConfig::user_config_path() {
        if home_config.exists() {
            return Ok(AppConfig::load(&home_config)?);
        }
    }
    Ok(AppConfig::default())
}
