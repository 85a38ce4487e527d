//! workflow-engine CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server.
//! - `migrate`  — run pending database migrations.
//! - `validate` — structurally validate a workflow graph JSON file.
//! - `execute`  — run a workflow graph JSON file straight from the CLI.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Parser)]
#[command(name = "workflow-engine", about = "Dynamic workflow graph interpreter", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, env = "DATABASE_URL", default_value = "sqlite://workflows.db")]
        database_url: String,
    },
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL", default_value = "sqlite://workflows.db")]
        database_url: String,
    },
    /// Structurally validate a workflow graph JSON file without running it.
    Validate {
        /// Path to the workflow graph JSON file.
        path: std::path::PathBuf,
    },
    /// Execute a workflow graph JSON file once, printing the resulting state.
    Execute {
        /// Path to the workflow graph JSON file.
        path: std::path::PathBuf,
        /// JSON document to use as the execution's `input`.
        #[arg(long, default_value = "{}")]
        inputs: String,
        #[arg(long, default_value = "sqlite://workflows.db")]
        database_url: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, database_url } => {
            info!("starting API server on {bind}");
            let pool = db::pool::create_pool(&database_url, 10)
                .await
                .expect("failed to connect to database");
            db::pool::run_migrations(&pool).await.expect("migration failed");
            let ledger = Arc::new(db::SqliteLedger::new(pool));
            let runtime = engine::Runtime::new(ledger);

            let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
            api::serve(&bind, runtime, cors).await.unwrap();
        }
        Command::Migrate { database_url } => {
            info!("running migrations against {database_url}");
            let pool = db::pool::create_pool(&database_url, 2)
                .await
                .expect("failed to connect to database");
            db::pool::run_migrations(&pool).await.expect("migration failed");
            info!("migrations applied successfully");
        }
        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));

            let graph: engine::WorkflowGraph =
                serde_json::from_str(&content).unwrap_or_else(|e| panic!("invalid JSON: {e}"));

            match engine::validate_graph(&graph) {
                Ok(()) => {
                    println!("workflow graph is valid: {} node(s), {} edge(s)", graph.nodes.len(), graph.edges.len());
                }
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Execute { path, inputs, database_url } => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));
            let graph: engine::WorkflowGraph =
                serde_json::from_str(&content).unwrap_or_else(|e| panic!("invalid JSON: {e}"));
            let inputs: serde_json::Value =
                serde_json::from_str(&inputs).unwrap_or_else(|e| panic!("invalid --inputs JSON: {e}"));

            let pool = db::pool::create_pool(&database_url, 2)
                .await
                .expect("failed to connect to database");
            db::pool::run_migrations(&pool).await.expect("migration failed");
            let ledger = Arc::new(db::SqliteLedger::new(pool));
            let runtime = engine::Runtime::new(ledger);

            let workflow_name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed");
            match runtime.execute(graph, inputs, workflow_name).await {
                Ok(snapshot) => {
                    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                        "execution_id": snapshot.execution_id,
                        "status": snapshot.status,
                        "state": snapshot.state,
                    })).unwrap());
                }
                Err(e) => {
                    eprintln!("execution failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
