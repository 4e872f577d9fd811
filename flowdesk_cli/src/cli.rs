use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flowdesk")]
#[command(about = "Flowdesk - edit pipeline connector configuration from the terminal")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  flowdesk config init                         Write a starter config file
  flowdesk show perf-source                    Show a connector's settings
  flowdesk set perf-source instances=3         Change a setting (saved after the debounce)
  flowdesk validate perf-source                Test the connection with the current settings

\x1b[1;36mLifecycle:\x1b[0m
  flowdesk start perf-source                   Start the connector
  flowdesk delete perf-source --pipeline p1    Delete it and return to its pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Backend base URL, e.g. http://localhost:5050/v0
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Worker cluster hosting the connector
    #[arg(short, long, global = true)]
    pub worker: Option<String>,

    /// Pipeline the connector belongs to
    #[arg(short, long, global = true, env = "FLOWDESK_PIPELINE")]
    pub pipeline: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a connector's settings, field definitions and state
    #[command(alias = "get")]
    Show {
        /// Connector id
        connector: String,
    },

    /// Set one or more fields and wait for the save
    ///
    /// Values are parsed as JSON when possible, otherwise taken as strings:
    /// `instances=3` sets a number, `name=orders-src` a string.
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  flowdesk set perf-source instances=3
  flowdesk set perf-source topics=orders 'perf.batch=true'")]
    Set {
        /// Connector id
        connector: String,
        /// key=value assignments
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },

    /// Edit rows of a table field
    Rows {
        #[command(subcommand)]
        action: RowsAction,
    },

    /// Test the connection with the connector's current settings
    Validate {
        /// Connector id
        connector: String,
    },

    /// Start the connector
    Start {
        /// Connector id
        connector: String,
    },

    /// Stop the connector
    Stop {
        /// Connector id
        connector: String,
    },

    /// Delete the connector (requires --pipeline)
    Delete {
        /// Connector id
        connector: String,
    },

    /// Manage flowdesk's own settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum RowsAction {
    /// Append a row, given as a JSON object
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  flowdesk rows add perf-source columns '{\"name\":\"id\",\"type\":\"INT\"}'")]
    Add {
        connector: String,
        column: String,
        row: String,
    },
    /// Remove the row at a 0-based index
    Remove {
        connector: String,
        column: String,
        index: usize,
    },
    /// Swap a row with the one above it
    Up {
        connector: String,
        column: String,
        order: usize,
    },
    /// Swap a row with the one below it
    Down {
        connector: String,
        column: String,
        order: usize,
    },
}

impl RowsAction {
    pub fn connector(&self) -> &str {
        match self {
            RowsAction::Add { connector, .. }
            | RowsAction::Remove { connector, .. }
            | RowsAction::Up { connector, .. }
            | RowsAction::Down { connector, .. } => connector,
        }
    }
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Show the effective settings
    Show,
    /// Print the config file location
    Path,
    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Plain text output
    Text,
}
