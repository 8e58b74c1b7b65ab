//! Attendance state machine.
//!
//! A scan resolves a raw identifier to a participant and moves them one
//! step along `pending → checked-in → checked-out`. A third scan of the same
//! identifier is rejected and leaves the record untouched.
//!
//! [`SharedRegistry`] serializes the match and the transition for setups
//! where several scanning stations share one registry.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::normalize::normalize;
use crate::participant::{Participant, Stamp, Status, DEFAULT_TIME_FORMAT};
use crate::registry::Registry;

/// Result of a single scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "participant", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// No participant has this identifier. Nothing changed.
    NotFound,
    /// The participant already checked out. Nothing changed.
    AlreadyCheckedOut(Participant),
    /// The participant was pending and is now checked in.
    CheckedIn(Participant),
    /// The participant was checked in and is now checked out.
    CheckedOut(Participant),
}

impl ScanOutcome {
    /// Whether the scan changed the registry.
    #[must_use]
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::CheckedIn(_) | Self::CheckedOut(_))
    }

    /// The participant the scan resolved to, if any.
    #[must_use]
    pub fn participant(&self) -> Option<&Participant> {
        match self {
            Self::NotFound => None,
            Self::AlreadyCheckedOut(p) | Self::CheckedIn(p) | Self::CheckedOut(p) => Some(p),
        }
    }
}

/// Matching and stamping options for scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Match against the secondary identifier as well as the primary one.
    pub match_secondary: bool,
    /// Normalize the scanned text before matching instead of trimming only.
    pub normalize_input: bool,
    /// strftime format for the display part of stamps.
    pub time_format: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            match_secondary: true,
            normalize_input: false,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

impl From<&crate::config::ScanConfig> for ScanOptions {
    fn from(config: &crate::config::ScanConfig) -> Self {
        Self {
            match_secondary: config.match_secondary,
            normalize_input: config.normalize_input,
            time_format: config.time_format.clone(),
        }
    }
}

impl ScanOptions {
    /// Turn raw scanner input into the key used for matching.
    #[must_use]
    pub fn scan_key(&self, raw: &str) -> String {
        if self.normalize_input {
            normalize(raw)
        } else {
            raw.trim().to_string()
        }
    }
}

impl Registry {
    /// Scan with default options at the current local time.
    pub fn scan(&mut self, raw: &str) -> ScanOutcome {
        self.scan_with(raw, &ScanOptions::default(), &Local::now())
    }

    /// Scan with explicit options and clock reading.
    ///
    /// The first matching record wins when identifiers are duplicated.
    pub fn scan_with(
        &mut self,
        raw: &str,
        options: &ScanOptions,
        now: &DateTime<Local>,
    ) -> ScanOutcome {
        let key = options.scan_key(raw);
        if key.is_empty() {
            warn!("Ignoring empty scan");
            return ScanOutcome::NotFound;
        }

        let Some(participant) = self.find_by_identifier_mut(&key, options.match_secondary) else {
            warn!("Scan {} matched no participant", key);
            return ScanOutcome::NotFound;
        };

        match participant.status {
            Status::CheckedOut => {
                warn!(
                    "Participant {} already checked out, scan rejected",
                    participant.id
                );
                ScanOutcome::AlreadyCheckedOut(participant.clone())
            }
            Status::Pending => {
                participant.status = Status::CheckedIn;
                participant.check_in_at = Some(Stamp::at(now, &options.time_format));
                info!("Participant {} checked in", participant.id);
                ScanOutcome::CheckedIn(participant.clone())
            }
            Status::CheckedIn => {
                participant.status = Status::CheckedOut;
                participant.check_out_at = Some(Stamp::at(now, &options.time_format));
                info!("Participant {} checked out", participant.id);
                ScanOutcome::CheckedOut(participant.clone())
            }
        }
    }
}

/// A registry shared between scanning stations.
///
/// Cloning the handle shares the same registry. Each scan holds the lock
/// from match to transition, so two stations scanning the same identifier
/// at once can never both observe `pending`.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SharedRegistry {
    /// Wrap a registry for sharing.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Scan atomically with default options at the current local time.
    #[must_use]
    pub fn scan(&self, raw: &str) -> ScanOutcome {
        self.lock().scan(raw)
    }

    /// Scan atomically with explicit options and clock reading.
    #[must_use]
    pub fn scan_with(
        &self,
        raw: &str,
        options: &ScanOptions,
        now: &DateTime<Local>,
    ) -> ScanOutcome {
        self.lock().scan_with(raw, options, now)
    }

    /// Copy the current participant list without holding the lock afterwards.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Participant> {
        self.lock().snapshot()
    }

    /// Run `f` with exclusive access to the registry.
    pub fn with<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut self.lock())
    }

    // Status and stamp are written together, so a poisoned guard is still consistent.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
