//! CLI command definitions for todo-board
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::format::OutputFormat;
use crate::types::TaskFilter;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormatArg {
    /// Human-readable markdown (default)
    #[default]
    Markdown,
    /// Machine-readable JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Todo board client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL (overrides config and environment)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Path to the session token file (overrides config)
    #[arg(long, global = true)]
    pub token_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Markdown, global = true)]
    pub format: FormatArg,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the access token
    SignIn(SignInArgs),

    /// Create an account and store the access token
    SignUp(SignUpArgs),

    /// Forget the stored access token
    SignOut,

    /// Show whether a token is stored
    Status,

    /// Check that the backend is reachable
    Health,

    /// List tasks
    List(ListArgs),

    /// Show a single task
    Show {
        /// Task id
        id: String,
    },

    /// Create a task
    Add(AddArgs),

    /// Change a task's title or description
    Edit(EditArgs),

    /// Delete a task
    Delete {
        /// Task id
        id: String,
    },

    /// Flip a task between active and completed
    Toggle {
        /// Task id
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct SignInArgs {
    #[arg(short, long)]
    pub email: String,

    #[arg(short, long, env = "TODO_BOARD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct SignUpArgs {
    #[arg(short, long)]
    pub email: String,

    #[arg(short, long, env = "TODO_BOARD_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Repeat the password (defaults to --password)
    #[arg(long)]
    pub confirm_password: Option<String>,

    /// Display name
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// all, active or completed
    #[arg(long, default_value = "all")]
    pub filter: TaskFilter,

    /// Case-insensitive match on title and description
    #[arg(short, long)]
    pub search: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title (1-100 characters)
    pub title: String,

    /// Optional description (up to 1000 characters)
    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Task id
    pub id: String,

    /// New title
    #[arg(short, long)]
    pub title: Option<String>,

    /// New description; a blank value clears it
    #[arg(short, long)]
    pub description: Option<String>,
}
