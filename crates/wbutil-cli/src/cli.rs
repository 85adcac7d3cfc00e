//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// wbutil - a grab-bag of small helper utilities
#[derive(Parser, Debug)]
#[command(name = "wbutil", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "WBUTIL_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize numbers given as arguments, in files, or on stdin
    Stats {
        /// Numbers to summarize (stdin is read when none are given)
        #[arg(allow_negative_numbers = true)]
        numbers: Vec<f64>,

        /// Files of whitespace-separated numbers, summarized concurrently
        #[arg(short, long = "file", conflicts_with = "numbers")]
        files: Vec<PathBuf>,
    },

    /// Echo stdin lines, dropping any line seen before
    Uniq,

    /// Train naive Bayes on a CSV file and classify one instance
    Bayes {
        /// Training data with a header row
        csv: PathBuf,

        /// Comma-separated cells of the instance to classify
        #[arg(short, long, value_delimiter = ',', required = true)]
        instance: Vec<String>,

        /// Label column; negative values count from the right
        #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
        label_index: isize,
    },

    /// Train a decision tree on a CSV file with a header row
    Tree {
        /// Training data; the label is the last column
        csv: PathBuf,

        /// Columns holding real numbers
        #[arg(long)]
        continuous: Vec<String>,

        /// Comma-separated cells of an instance to classify
        #[arg(long, value_delimiter = ',')]
        classify: Option<Vec<String>>,

        /// Print the tree as Graphviz DOT
        #[arg(long)]
        dot: bool,

        /// Override the configured minimum node size for branching
        #[arg(long)]
        min_samples: Option<usize>,
    },

    /// Manage the configuration file
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `wbutil config` actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path
    Path,
    /// Print the effective configuration as TOML
    Show,
    /// Print one value by dotted key (e.g. `retry.times`)
    Get {
        /// Dotted key
        key: String,
    },
    /// Write a default config file
    Init {
        /// Where to write (defaults to the resolved path)
        #[arg(long)]
        file: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
