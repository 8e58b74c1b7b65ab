//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::participant::Status;

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Display name of the participant
    pub name: String,

    /// Phone number or other primary identifier
    pub identifier: String,

    /// Alternate identifier, such as a student ID
    #[arg(short, long)]
    pub secondary: Option<String>,

    /// Location as "lat,lng"
    #[arg(short, long)]
    pub location: Option<String>,

    /// Event the participant is registered for
    #[arg(short, long, value_name = "ID")]
    pub event: Option<i64>,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// CSV file with name and identifier columns
    pub file: PathBuf,
}

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Scanned identifier
    pub identifier: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Station command arguments.
#[derive(Debug, Args)]
pub struct StationCommand {
    /// Print each outcome as a JSON line
    #[arg(short, long)]
    pub json: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show participants with this status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusArg>,

    /// Only show participants registered for this event
    #[arg(short, long, value_name = "ID")]
    pub event: Option<i64>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Edit command arguments.
///
/// Only the given fields change; stamps are re-derived from the status.
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Participant id
    pub id: u64,

    /// New display name
    #[arg(long)]
    pub name: Option<String>,

    /// New primary identifier (normalized)
    #[arg(long)]
    pub identifier: Option<String>,

    /// New secondary identifier
    #[arg(long)]
    pub secondary: Option<String>,

    /// New status
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,

    /// New location as "lat,lng"
    #[arg(long)]
    pub location: Option<String>,

    /// New event id
    #[arg(long, value_name = "ID")]
    pub event: Option<i64>,
}

/// Export commands.
#[derive(Debug, Subcommand)]
pub enum ExportCommand {
    /// Write the attendance list as spreadsheet-friendly CSV
    Csv {
        /// Output file
        path: PathBuf,
    },

    /// Render the attendance report (stdout when no path is given)
    Report {
        /// Output file
        path: Option<PathBuf>,
    },
}

/// Confirmation flag for destructive commands.
#[derive(Debug, Args)]
pub struct ConfirmArgs {
    /// Confirm the operation
    #[arg(short, long)]
    pub yes: bool,
}

/// Event commands.
#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// Create an event
    Add {
        /// Event name
        name: String,

        /// Event date, free text
        #[arg(short, long)]
        date: Option<String>,

        /// Venue
        #[arg(short, long)]
        location: Option<String>,

        /// Longer description
        #[arg(long)]
        description: Option<String>,
    },

    /// List events
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Remove an event; its participants are kept
    Remove {
        /// Event id
        id: i64,
    },
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

/// Output selector shared by read-only commands.
#[derive(Debug, Args)]
pub struct JsonFlag {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status argument for filtering and editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Not yet arrived
    Pending,
    /// Currently at the event
    CheckedIn,
    /// Has left
    CheckedOut,
}

impl From<StatusArg> for Status {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => Self::Pending,
            StatusArg::CheckedIn => Self::CheckedIn,
            StatusArg::CheckedOut => Self::CheckedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_arg_conversion() {
        assert_eq!(Status::from(StatusArg::Pending), Status::Pending);
        assert_eq!(Status::from(StatusArg::CheckedIn), Status::CheckedIn);
        assert_eq!(Status::from(StatusArg::CheckedOut), Status::CheckedOut);
    }

    #[test]
    fn test_status_arg_names_match_status() {
        for arg in StatusArg::value_variants() {
            let name = arg.to_possible_value().unwrap();
            assert_eq!(name.get_name(), Status::from(*arg).as_str());
        }
    }

    #[test]
    fn test_export_command_debug() {
        let cmd = ExportCommand::Report { path: None };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Report"));
    }

    #[test]
    fn test_event_command_debug() {
        let cmd = EventCommand::Remove { id: 3 };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Remove"));
        assert!(debug_str.contains('3'));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
