// ABOUTME: CLI entry point for postgres-tenant-merger
// ABOUTME: Parses commands and routes to appropriate handlers

use clap::{Parser, Subcommand};
use postgres_tenant_merger::commands;
use postgres_tenant_merger::config::FkRules;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "postgres-tenant-merger")]
#[command(about = "Merge per-tenant PostgreSQL schemas into a single public schema", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a multi-schema dump into a public-schema dump, offsetting keys per tenant
    Merge {
        /// Input dump; a .gz suffix selects transparent decompression
        input: PathBuf,
        /// Output dump; a .gz suffix selects transparent compression
        output: PathBuf,
        /// TOML file with include_fks/exclude_fks overrides for foreign-key columns
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Print the ActiveRecord migration that adds tenant_id to every tenanted table
    GenerateMigration {
        /// Rails application root (reads config/initializers/apartment.rb and db/schema.rb)
        #[arg(default_value = ".")]
        app_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Merge {
            input,
            output,
            rules,
        } => {
            let rules = match rules {
                Some(path) => FkRules::load(&path)?,
                None => FkRules::default(),
            };
            commands::merge(&input, &output, &rules)
        }
        Commands::GenerateMigration { app_dir } => commands::generate_migration(&app_dir),
    }
}
