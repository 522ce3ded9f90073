mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::Commands;
use output::{ErrorResponse, print_json};
use reverie::{Config, Error, MemoryStore, embedding};

/// reverie - category memory with semantic recall for generation pipelines
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Durable log path (enables persistence)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Keep memories in this process only
    #[arg(long, global = true, conflicts_with = "db")]
    in_memory: bool,

    /// Use per-category flat indexes for recall
    #[arg(long, global = true)]
    index: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode, Error> {
    if let Commands::Version = cli.command {
        return commands::handle_version(cli.json);
    }

    let mut config = Config::load()?;
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
        config.persist = true;
    }
    if cli.in_memory {
        config.persist = false;
    }
    if cli.index {
        config.use_index = true;
    }
    config.validate()?;
    config.ensure_directories()?;

    let embedder = embedding::from_config(&config)?;
    let store = MemoryStore::new(&config, embedder)?;
    let result = commands::execute(&cli.command, &store, cli.json);
    store.close();
    result
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            if cli.json {
                print_json(&ErrorResponse {
                    error: e.to_string(),
                });
            } else {
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}
