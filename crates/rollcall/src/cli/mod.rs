//! Command-line interface for rollcall.
//!
//! This module provides the CLI structure for the `rollcall` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, ConfigCommand, ConfirmArgs, EditCommand, EventCommand, ExportCommand,
    ImportCommand, JsonFlag, ListCommand, ScanCommand, StationCommand, StatusArg,
};

use crate::logging::Verbosity;

/// rollcall - Event check-in and check-out tracking
///
/// Register participants, scan them in and out at the door, and export
/// who came and who left.
#[derive(Debug, Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
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
    /// Register a participant
    Add(AddCommand),

    /// Register participants from a CSV file
    Import(ImportCommand),

    /// Scan one identifier
    Scan(ScanCommand),

    /// Read scans from stdin, one per line, until end of input
    Station(StationCommand),

    /// List participants
    List(ListCommand),

    /// Edit a participant
    Edit(EditCommand),

    /// Show attendance statistics
    Stats(JsonFlag),

    /// Show participant locations and their bounding box
    Map(JsonFlag),

    /// Export attendance
    #[command(subcommand)]
    Export(ExportCommand),

    /// Return every participant to pending
    Reset(ConfirmArgs),

    /// Remove every participant
    Clear(ConfirmArgs),

    /// Manage events
    #[command(subcommand)]
    Event(EventCommand),

    /// Show database status
    Status(JsonFlag),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
