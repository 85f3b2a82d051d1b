use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// fieldscope - explore the field tree of binary files
#[derive(Debug, Parser)]
#[command(name = "fieldscope", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Args)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip the format validation gate and integrity checks.
    #[arg(long, global = true)]
    pub lenient: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Display the detected format, validation result, size and parser diagnostics.
    Info {
        /// Path to the file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Show the value, display, description, address and size of one field.
    Get {
        /// Path to the file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Field path, e.g. /table[0]/unit_per_em.
        #[arg(value_name = "PATH")]
        field: String,
    },

    /// List the direct children of a field set.
    List {
        /// Path to the file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Field set to list (default: the root).
        #[arg(value_name = "PATH")]
        field: Option<String>,
    },

    /// Extract document metadata (title, author, dates...).
    Metadata {
        /// Path to the file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Estimate the video quality of files, falling back to their names.
    Quality {
        /// Files to probe.
        #[arg(value_name = "FILE", required = true)]
        paths: Vec<PathBuf>,
    },
}
