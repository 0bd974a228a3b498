//! Itembank merge CLI
//!
//! Previews or executes a merge of two JSON item collections.

use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use itembank::merge::{MergeEngine, MergeStrategy};
use itembank::{Item, MergeConfig};

#[derive(Parser)]
#[command(name = "itembank-merge")]
#[command(about = "Conflict-aware merge of question item banks")]
#[command(version)]
struct Cli {
    /// Similarity above which records count as content duplicates
    #[arg(long, env = "ITEMBANK_DUPLICATE_THRESHOLD")]
    duplicate_threshold: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what a merge would do without writing anything
    Preview {
        /// Existing collection (JSON array of items)
        existing: String,
        /// Incoming collection (JSON array of items)
        incoming: String,
        /// Merge strategy
        #[arg(short, long, default_value = "append_all")]
        strategy: String,
        /// Renumber trivially sequential incoming ids first
        #[arg(long)]
        renumber: bool,
    },
    /// Merge and write the resulting collection
    Execute {
        /// Existing collection (JSON array of items)
        existing: String,
        /// Incoming collection (JSON array of items)
        incoming: String,
        /// Merge strategy
        #[arg(short, long, default_value = "append_all")]
        strategy: String,
        /// Renumber trivially sequential incoming ids first
        #[arg(long)]
        renumber: bool,
        /// Output file (- for stdout)
        #[arg(short, long, default_value = "-")]
        output: String,
    },
    /// List available strategies
    Strategies,
}

fn read_items(path: &str) -> Result<Vec<Item>> {
    let path = shellexpand::tilde(path).to_string();
    let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse items in {}", path))
}

fn load(
    engine: &MergeEngine,
    existing: &str,
    incoming: &str,
    renumber: bool,
) -> Result<(Vec<Item>, Vec<Item>)> {
    let existing = read_items(existing)?;
    let mut incoming = read_items(incoming)?;
    if renumber {
        let (prepared, renumbered) = engine.prepare_incoming(&existing, &incoming);
        if renumbered {
            eprintln!("Renumbered {} sequential incoming items", prepared.len());
        }
        incoming = prepared;
    }
    Ok((existing, incoming))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = MergeConfig::from_env();
    if let Some(threshold) = cli.duplicate_threshold {
        config = config.with_duplicate_threshold(threshold);
    }
    let engine = MergeEngine::new(config);

    match cli.command {
        Commands::Preview {
            existing,
            incoming,
            strategy,
            renumber,
        } => {
            let strategy: MergeStrategy = strategy.parse()?;
            let (existing, incoming) = load(&engine, &existing, &incoming, renumber)?;
            let preview = engine.preview(&existing, &incoming, strategy);
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }

        Commands::Execute {
            existing,
            incoming,
            strategy,
            renumber,
            output,
        } => {
            let (existing, incoming) = load(&engine, &existing, &incoming, renumber)?;
            let result = engine.execute_named(&existing, &incoming, &strategy, None);
            eprintln!("{}", result.outcome_message());
            if !result.success {
                std::process::exit(1);
            }

            let json = serde_json::to_string_pretty(&result.merged)?;
            if output == "-" {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{}", json)?;
            } else {
                let path = shellexpand::tilde(&output).to_string();
                fs::write(&path, json).with_context(|| format!("Failed to write {}", path))?;
            }
            if let Some(rollback_ref) = result.rollback_ref {
                eprintln!("Rollback reference: {}", rollback_ref);
            }
        }

        Commands::Strategies => {
            for strategy in MergeStrategy::ALL {
                println!("{}", strategy);
            }
        }
    }

    Ok(())
}
