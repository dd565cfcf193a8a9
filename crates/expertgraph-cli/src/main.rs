//! ExpertGraph — inspect and edit a knowledge graph file from the shell.

use anyhow::{bail, Context};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use expertgraph_core::GraphConfig;
use expertgraph_store::{properties_from_value, EdgeOptions, GraphStore, Properties};

#[derive(Debug, PartialEq)]
enum Command {
    Stats,
    Read,
    Search(String),
    Open(Vec<String>),
    Related {
        id: String,
        relationship_type: Option<String>,
    },
    AddNode {
        name: String,
        node_type: String,
        properties: Properties,
    },
    AddEdge {
        source: String,
        target: String,
        edge_type: String,
        bidirectional: bool,
    },
    Clear,
    Help,
}

fn parse_command(args: &[String]) -> anyhow::Result<Command> {
    let Some(cmd) = args.first() else {
        return Ok(Command::Help);
    };
    let rest = &args[1..];

    let command = match cmd.as_str() {
        "stats" => Command::Stats,
        "read" => Command::Read,
        "search" => match rest {
            [query] => Command::Search(query.clone()),
            _ => bail!("Usage: expertgraph search <query>"),
        },
        "open" => {
            if rest.is_empty() {
                bail!("Usage: expertgraph open <id>...");
            }
            Command::Open(rest.to_vec())
        }
        "related" => match rest {
            [id] => Command::Related {
                id: id.clone(),
                relationship_type: None,
            },
            [id, rel] => Command::Related {
                id: id.clone(),
                relationship_type: Some(rel.clone()),
            },
            _ => bail!("Usage: expertgraph related <id> [type]"),
        },
        "add-node" => match rest {
            [name, node_type] | [name, node_type, _] => {
                let properties = match rest.get(2) {
                    Some(raw) => {
                        let value: Value =
                            serde_json::from_str(raw).context("properties must be valid JSON")?;
                        properties_from_value(value)?
                    }
                    None => Properties::new(),
                };
                Command::AddNode {
                    name: name.clone(),
                    node_type: node_type.clone(),
                    properties,
                }
            }
            _ => bail!("Usage: expertgraph add-node <name> <type> [properties-json]"),
        },
        "add-edge" => {
            let bidirectional = rest.iter().any(|a| a == "--bidirectional");
            let positional: Vec<&String> = rest.iter().filter(|a| *a != "--bidirectional").collect();
            match positional.as_slice() {
                [source, target, edge_type] => Command::AddEdge {
                    source: source.to_string(),
                    target: target.to_string(),
                    edge_type: edge_type.to_string(),
                    bidirectional,
                },
                _ => bail!("Usage: expertgraph add-edge <source> <target> <type> [--bidirectional]"),
            }
        }
        "clear" => Command::Clear,
        "--help" | "-h" | "help" => Command::Help,
        other => bail!("Unknown command: {}. Use 'expertgraph help' for usage.", other),
    };
    Ok(command)
}

fn run(store: &GraphStore, command: Command) -> anyhow::Result<Value> {
    let out = match command {
        Command::Stats => json!({
            "stats": store.stats(),
            "sync": store.sync_status(),
            "path": store.path().map(|p| p.display().to_string()),
            "id_scheme": store.id_scheme(),
        }),
        Command::Read => serde_json::to_value(store.get_all())?,
        Command::Search(query) => serde_json::to_value(store.search(&query))?,
        Command::Open(ids) => serde_json::to_value(store.open_nodes(ids.as_slice()))?,
        Command::Related {
            id,
            relationship_type,
        } => serde_json::to_value(store.get_related(&id, relationship_type.as_deref()))?,
        Command::AddNode {
            name,
            node_type,
            properties,
        } => {
            let id = store.add_node(&name, &node_type, properties)?;
            json!({ "id": id })
        }
        Command::AddEdge {
            source,
            target,
            edge_type,
            bidirectional,
        } => {
            let options = EdgeOptions {
                bidirectional,
                ..Default::default()
            };
            store.add_edge(&source, &target, &edge_type, options)?;
            json!({ "success": true })
        }
        Command::Clear => {
            store.clear();
            json!({ "success": true })
        }
        Command::Help => json!(null),
    };

    let sync = store.sync_status();
    if sync.dirty {
        bail!(
            "knowledge graph not saved: {}",
            sync.last_error.unwrap_or_default()
        );
    }
    Ok(out)
}

fn print_help() {
    println!("ExpertGraph — knowledge graph of code reviews and experts");
    println!();
    println!("Usage: expertgraph <command>");
    println!();
    println!("Commands:");
    println!("  stats                                  Node/edge counts and save status");
    println!("  read                                   Print the whole graph");
    println!("  search <query>                         Case-insensitive node search");
    println!("  open <id>...                           Print nodes by id");
    println!("  related <id> [type]                    Targets of outgoing edges");
    println!("  add-node <name> <type> [json]          Add or replace a node");
    println!("  add-edge <src> <dst> <type> [--bidirectional]");
    println!("  clear                                  Delete all nodes, edges and the file");
    println!();
    println!("Environment:");
    println!("  KNOWLEDGE_GRAPH_PATH       Backing file (default data/knowledge_graph.json)");
    println!("  KNOWLEDGE_GRAPH_ID_SCHEME  name | uuid (default name)");
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if command == Command::Help {
        print_help();
        return Ok(());
    }

    let config = GraphConfig::from_env()?;
    info!("Using knowledge graph config: {:?}", config);
    let store = GraphStore::open(config);

    match run(&store, command) {
        Ok(out) => {
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
