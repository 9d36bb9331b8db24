//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use uuid::Uuid;

/// Check-in command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Image snapshot of the face to check in
    pub image: PathBuf,
}

/// Registration command arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Image snapshot of the face to enroll
    pub image: PathBuf,

    /// Full name (required)
    #[arg(short, long)]
    pub name: String,

    /// Email address
    #[arg(short, long, default_value = "")]
    pub email: String,

    /// Department
    #[arg(short, long, default_value = "")]
    pub department: String,
}

/// Mark-present command arguments.
#[derive(Debug, Args)]
pub struct MarkCommand {
    /// Identifier of the registered user
    pub user_id: Uuid,
}

/// Registered user commands.
#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List registered users
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete a user and their attendance records
    Delete {
        /// Identifier of the user to delete
        user_id: Uuid,
    },
}

/// Attendance history commands.
#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// Show recent attendance records, newest first
    List {
        /// Maximum number of records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete all attendance records
    Clear,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Output file (defaults to `attendance-data-<date>.json`, `-` for stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Reset command arguments.
#[derive(Debug, Args)]
pub struct ResetCommand {
    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
