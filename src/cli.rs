use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "agent-manager")]
#[command(about = "Install and update AI coding agents across package managers", long_about = None)]
#[command(version = env!("AGENT_MANAGER_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Agent catalog file to use instead of the builtin one
    #[arg(long, global = true, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Timeout in seconds for each external command (0 disables it)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Show debug logs
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List agents in the catalog and whether they are installed
    List,

    /// Show the install methods of an agent usable on this machine
    Methods {
        /// Agent ID (see `list`)
        agent: String,
    },

    /// Install an agent
    Install {
        agent: String,

        /// Install method (defaults to the first usable one)
        #[arg(short, long)]
        method: Option<String>,

        /// Reinstall even if already present
        #[arg(long)]
        force: bool,
    },

    /// Update an installed agent, or every installed agent with --all
    Update {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        agent: Option<String>,

        #[arg(short, long)]
        method: Option<String>,

        /// Update every installed agent, one after another
        #[arg(long)]
        all: bool,
    },

    /// Uninstall an agent
    Uninstall {
        agent: String,

        #[arg(short, long)]
        method: Option<String>,
    },

    /// Query the latest published version of an agent
    Latest {
        agent: String,

        #[arg(short, long)]
        method: Option<String>,
    },

    /// Suggest a fix for a package manager error message
    Hint {
        /// Package manager that failed (npm, pip, brew, ...)
        manager: String,

        /// Operation that failed (install, update, ...)
        operation: String,

        /// Error output; read from stdin when omitted
        stderr: Option<String>,
    },

    /// Compare two versions
    Compare { a: String, b: String },

    /// Check a version against a constraint such as ^1.2 or >=2.0.0
    Satisfies { version: String, constraint: String },
}
