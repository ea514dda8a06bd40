use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;

#[derive(Parser)]
#[command(name = "fundrepo")]
#[command(about = "Fund NAV store and performance report CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the store, bootstrap it if empty, then write the annual and monthly reports
    Run {
        /// Use the local CSV store instead of SQLite
        #[arg(short, long)]
        local: bool,

        /// Bootstrap from this CSV file instead of fetching from EastMoney
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Fetch fund histories from EastMoney and merge them into the store
    Ingest {
        /// Use the local CSV store instead of SQLite
        #[arg(short, long)]
        local: bool,

        /// Comma-separated fund codes (default: first funds of the directory)
        #[arg(short, long, value_delimiter = ',')]
        codes: Vec<String>,

        /// Skip writing per-fund CSV exports
        #[arg(long)]
        no_export: bool,
    },
    /// Merge a CSV file of Code,Name,TradingDay,UnitNAV,CumNAV,Return rows into the store
    Import {
        /// CSV file to import
        file: PathBuf,

        /// Use the local CSV store instead of SQLite
        #[arg(short, long)]
        local: bool,
    },
    /// Write the annual and monthly reports from the current store
    Report {
        /// Use the local CSV store instead of SQLite
        #[arg(short, long)]
        local: bool,
    },
    /// Show current status
    Status {
        /// Use the local CSV store instead of SQLite
        #[arg(short, long)]
        local: bool,
    },
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { local, file } => {
            commands::run::run(local, file);
        }
        Commands::Ingest {
            local,
            codes,
            no_export,
        } => {
            let codes = codes
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            commands::ingest::run(local, codes, no_export);
        }
        Commands::Import { file, local } => {
            commands::import::run(file, local);
        }
        Commands::Report { local } => {
            commands::report::run(local);
        }
        Commands::Status { local } => {
            commands::status::run(local);
        }
    }
}
