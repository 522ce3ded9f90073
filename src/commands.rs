//! Command handlers for the reverie CLI.

use std::process::ExitCode;

use reverie::{Error, MemoryStore, parse_metadata};

use crate::output::*;

/// Commands supported by the reverie CLI.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Store a memory in a category
    Store {
        /// Category name (e.g. story_context)
        category: String,

        /// Memory text content
        text: String,

        /// Optional JSON object metadata
        #[arg(short = 'm', long)]
        metadata: Option<String>,
    },
    /// Recall the memories most similar to a query
    Recall {
        /// Category to search
        category: String,

        /// Query text
        query: String,

        /// Maximum number of results (default: 3)
        #[arg(short = 'k', long, default_value = "3")]
        top_k: usize,
    },
    /// Record feedback about an agent's output
    Feedback {
        /// Agent name
        agent: String,

        /// Quality score between 0.0 and 1.0
        score: f64,

        /// Feedback text
        #[arg(default_value = "")]
        text: String,
    },
    /// List the newest memories of a category
    List {
        /// Category name
        category: String,

        /// Maximum number of results (default: 10)
        #[arg(short = 'l', long, default_value = "10")]
        limit: usize,
    },
    /// Show record counts per category
    Summary,
    /// Clear one category, or every category when none is given
    Clear {
        /// Category to clear
        category: Option<String>,
    },
    Version,
}

/// Execute a CLI command.
pub fn execute(command: &Commands, store: &MemoryStore, json: bool) -> Result<ExitCode, Error> {
    match command {
        Commands::Store {
            category,
            text,
            metadata,
        } => handle_store(store, category, text, metadata.as_deref(), json),
        Commands::Recall {
            category,
            query,
            top_k,
        } => handle_recall(store, category, query, *top_k, json),
        Commands::Feedback { agent, score, text } => {
            handle_feedback(store, agent, *score, text, json)
        }
        Commands::List { category, limit } => handle_list(store, category, *limit, json),
        Commands::Summary => handle_summary(store, json),
        Commands::Clear { category } => handle_clear(store, category.as_deref(), json),
        Commands::Version => handle_version(json),
    }
}

fn handle_store(
    store: &MemoryStore,
    category: &str,
    text: &str,
    metadata: Option<&str>,
    json: bool,
) -> Result<ExitCode, Error> {
    let metadata = metadata.map(parse_metadata).transpose()?;
    let record = store.store(category, text, metadata)?;
    if json {
        print_json(&StoreResponse {
            status: "stored".to_string(),
            category: category.to_string(),
            timestamp: record.timestamp.clone(),
        });
    } else {
        println!("Stored memory in {} at {}", category, record.timestamp);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_recall(
    store: &MemoryStore,
    category: &str,
    query: &str,
    top_k: usize,
    json: bool,
) -> Result<ExitCode, Error> {
    let hits = store.recall(category, query, top_k)?;
    if json {
        let results = hits
            .into_iter()
            .map(|hit| RecallItem {
                content: hit.record.content.clone(),
                similarity: hit.similarity,
                timestamp: hit.record.timestamp.clone(),
                metadata: hit.record.metadata.clone(),
            })
            .collect();
        print_json(&RecallResponse { results });
    } else if hits.is_empty() {
        println!("No memories in {}", category);
    } else {
        for hit in hits {
            println!(
                "[score: {:.3}] {}\n  {}\n",
                hit.similarity, hit.record.timestamp, hit.record.content
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_feedback(
    store: &MemoryStore,
    agent: &str,
    score: f64,
    text: &str,
    json: bool,
) -> Result<ExitCode, Error> {
    let record = store.record_feedback(agent, score, text)?;
    if json {
        print_json(&StoreResponse {
            status: "recorded".to_string(),
            category: reverie::FEEDBACK_CATEGORY.to_string(),
            timestamp: record.timestamp.clone(),
        });
    } else {
        println!("Recorded feedback for {} (score: {:.2})", agent, score);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_list(
    store: &MemoryStore,
    category: &str,
    limit: usize,
    json: bool,
) -> Result<ExitCode, Error> {
    let records = store.recent(category, limit);
    if json {
        let memories = records
            .iter()
            .map(|r| ListItem {
                content: r.content.clone(),
                timestamp: r.timestamp.clone(),
            })
            .collect();
        print_json(&ListResponse { memories });
    } else {
        for record in records {
            println!("{}: {}", record.timestamp, record.content);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_summary(store: &MemoryStore, json: bool) -> Result<ExitCode, Error> {
    let categories = store.summary();
    if json {
        print_json(&SummaryResponse {
            categories,
            persistent: store.is_persistent(),
            searcher: store.searcher_name().to_string(),
        });
    } else {
        for (category, count) in categories {
            println!("{:<24} {}", category, count);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_clear(store: &MemoryStore, category: Option<&str>, json: bool) -> Result<ExitCode, Error> {
    store.clear(category);
    if json {
        print_json(&ClearResponse {
            status: "cleared".to_string(),
            category: category.map(str::to_string),
        });
    } else {
        match category {
            Some(category) => println!("Cleared {}", category),
            None => println!("Cleared all categories"),
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn handle_version(json: bool) -> Result<ExitCode, Error> {
    if json {
        print_json(&serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "name": env!("CARGO_PKG_NAME")
        }));
    } else {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    }
    Ok(ExitCode::SUCCESS)
}
