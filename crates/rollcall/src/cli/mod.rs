//! Command-line interface for rollcall.
//!
//! This module provides the CLI structure for the `rollcall` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CheckCommand, ConfigCommand, ExportCommand, HistoryCommand, MarkCommand, OutputFormat,
    RegisterCommand, ResetCommand, StatsCommand, StatusCommand, UsersCommand,
};

use crate::logging::Verbosity;

/// rollcall - Face check-in attendance tracking
///
/// Check people in from an image snapshot, enroll new faces, and review
/// attendance history and daily statistics.
#[derive(Debug, Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recognize a snapshot and mark the person present
    Check(CheckCommand),

    /// Enroll a new face
    Register(RegisterCommand),

    /// Mark a registered user present without recognition
    Mark(MarkCommand),

    /// Manage registered users
    #[command(subcommand)]
    Users(UsersCommand),

    /// View or clear attendance history
    #[command(subcommand)]
    History(HistoryCommand),

    /// Show today's attendance statistics
    Stats(StatsCommand),

    /// Export users and attendance history as JSON
    Export(ExportCommand),

    /// Delete all users and attendance history
    Reset(ResetCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::from_occurrences(self.verbose)
        }
    }
}

impl Command {
    /// Whether the command needs the loaded configuration.
    ///
    /// `config path` and `config validate` must work even when the default
    /// configuration file is broken.
    #[must_use]
    pub fn needs_config(&self) -> bool {
        !matches!(
            self,
            Command::Config(ConfigCommand::Path | ConfigCommand::Validate { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "rollcall");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["rollcall", "-q", "stats"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["rollcall", "stats"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["rollcall", "-v", "stats"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["rollcall", "-vvv", "stats"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_check() {
        let cli = parse(&["rollcall", "check", "face.jpg"]);
        match cli.command {
            Command::Check(cmd) => assert_eq!(cmd.image, PathBuf::from("face.jpg")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_register() {
        let cli = parse(&[
            "rollcall", "register", "face.png", "--name", "Ann", "-d", "Ops",
        ]);
        match cli.command {
            Command::Register(cmd) => {
                assert_eq!(cmd.name, "Ann");
                assert_eq!(cmd.department, "Ops");
                assert!(cmd.email.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_register_requires_name() {
        assert!(Cli::try_parse_from(["rollcall", "register", "face.png"]).is_err());
    }

    #[test]
    fn test_parse_mark_requires_uuid() {
        let id = uuid::Uuid::new_v4().to_string();
        let cli = parse(&["rollcall", "mark", id.as_str()]);
        assert!(matches!(cli.command, Command::Mark(_)));
        assert!(Cli::try_parse_from(["rollcall", "mark", "not-a-uuid"]).is_err());
    }

    #[test]
    fn test_parse_users() {
        let cli = parse(&["rollcall", "users", "list", "--json"]);
        assert!(matches!(
            cli.command,
            Command::Users(UsersCommand::List { json: true })
        ));

        let id = uuid::Uuid::new_v4();
        let id_arg = id.to_string();
        let cli = parse(&["rollcall", "users", "delete", id_arg.as_str()]);
        match cli.command {
            Command::Users(UsersCommand::Delete { user_id }) => assert_eq!(user_id, id),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_history() {
        let cli = parse(&["rollcall", "history", "list", "-l", "5", "-f", "json"]);
        assert!(matches!(
            cli.command,
            Command::History(HistoryCommand::List {
                limit: Some(5),
                format: OutputFormat::Json
            })
        ));

        let cli = parse(&["rollcall", "history", "clear"]);
        assert!(matches!(cli.command, Command::History(HistoryCommand::Clear)));
    }

    #[test]
    fn test_parse_export_reset_status() {
        let cli = parse(&["rollcall", "export", "-o", "out.json"]);
        match cli.command {
            Command::Export(cmd) => assert_eq!(cmd.output, Some(PathBuf::from("out.json"))),
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(matches!(
            parse(&["rollcall", "reset", "--yes"]).command,
            Command::Reset(ResetCommand { yes: true })
        ));
        assert!(matches!(
            parse(&["rollcall", "status"]).command,
            Command::Status(_)
        ));
    }

    #[test]
    fn test_needs_config() {
        assert!(parse(&["rollcall", "stats"]).command.needs_config());
        assert!(parse(&["rollcall", "config", "show"]).command.needs_config());
        assert!(!parse(&["rollcall", "config", "path"]).command.needs_config());
        assert!(!parse(&["rollcall", "config", "validate", "-f", "other.toml"])
            .command
            .needs_config());
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["rollcall", "-c", "/custom/config.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }
}
