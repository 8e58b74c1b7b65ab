//! `rollcall` - Event check-in and check-out tracking
//!
//! This library provides the attendance engine behind the `rollcall` binary:
//! a participant registry, a scan state machine that moves participants from
//! pending to checked in to checked out, identifier normalization, location
//! bounds, statistics, and CSV import and export.
//!
//! ```
//! use rollcall::{Registry, ScanOutcome};
//!
//! let mut registry = Registry::new();
//! registry.add("Somchai", "081-234-5678");
//!
//! assert!(matches!(registry.scan("0812345678"), ScanOutcome::CheckedIn(_)));
//! assert!(matches!(registry.scan("0812345678"), ScanOutcome::CheckedOut(_)));
//! assert!(matches!(registry.scan("0812345678"), ScanOutcome::AlreadyCheckedOut(_)));
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod geo;
pub mod import;
pub mod logging;
pub mod normalize;
pub mod participant;
pub mod registry;
pub mod scan;
pub mod stats;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use geo::{compute_bounds, parse_location, BoundingBox, Coordinate};
pub use logging::init_logging;
pub use normalize::normalize;
pub use participant::{Event, NewParticipant, Participant, Stamp, Status};
pub use registry::{DuplicatePolicy, ImportReport, ParticipantStore, Registry};
pub use scan::{ScanOptions, ScanOutcome, SharedRegistry};
pub use stats::{compute_stats, Stats};
pub use storage::{Storage, StorageStats};
