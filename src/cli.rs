use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::StatusBucket;

#[derive(Parser)]
#[command(author, version, about = "Maintenance calendar and repair record viewer", long_about = None)]
pub struct Cli {
    /// SQLite file holding settings and visited cards
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a month grid with the daily and monthly plan listings
    Calendar {
        /// Month to show, defaults to the current one
        #[arg(short, long, value_name = "YYYY-MM")]
        month: Option<String>,
        /// Date to select
        #[arg(short, long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
        /// Schedule endpoint URL or JSON file
        #[arg(short, long, value_name = "URL_OR_FILE")]
        source: Option<String>,
    },
    /// List the plans of a single day
    Day {
        #[arg(value_name = "YYYY-MM-DD")]
        date: String,
        #[arg(short, long, value_name = "URL_OR_FILE")]
        source: Option<String>,
        /// Print the plans as JSON
        #[arg(long)]
        json: bool,
    },
    /// Browse repair records grouped by year
    Repairs {
        #[arg(short, long, value_name = "YEAR")]
        year: Option<String>,
        /// Case-insensitive text matched against title, status, date and amount
        #[arg(long, value_name = "TEXT")]
        search: Option<String>,
        /// Status bucket; overrides --year and --search
        #[arg(short, long, value_enum)]
        filter: Option<StatusBucket>,
        #[arg(short, long, value_name = "URL_OR_FILE")]
        source: Option<String>,
        /// Print the rendered view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Expand a repair card and mark it visited
    Open {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(short, long, value_name = "URL_OR_FILE")]
        source: Option<String>,
    },
    /// List visited repair card ids
    Visited {
        /// Forget every visited card
        #[arg(long)]
        clear: bool,
    },
    /// Store a setting
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Print a stored setting
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// List stored settings and the resolved configuration
    ConfigList,
    /// Remove a stored setting
    ConfigDelete {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Launch TUI interface
    Tui {
        #[arg(long, value_name = "URL_OR_FILE")]
        schedule_source: Option<String>,
        #[arg(long, value_name = "URL_OR_FILE")]
        repair_source: Option<String>,
    },
    /// Print shell completions
    Completions {
        #[arg(value_name = "SHELL")]
        shell: String,
    },
}
