//! Core attendance types.
//!
//! This module defines the records the registry holds: participants, their
//! attendance status and the stamps recorded at each transition, plus the
//! events participants may be grouped under.

use std::str::FromStr;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Display format used for stamps when no configuration is supplied.
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

/// Attendance status of a participant.
///
/// Transitions only move forward: `Pending` → `CheckedIn` → `CheckedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Registered but not yet arrived.
    #[default]
    Pending,
    /// Scanned once and currently at the event.
    CheckedIn,
    /// Scanned twice and has left.
    CheckedOut,
}

impl Status {
    /// All statuses in transition order.
    pub const ALL: [Status; 3] = [Self::Pending, Self::CheckedIn, Self::CheckedOut];

    /// Stable machine name, also used in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::CheckedIn => "checked-in",
            Self::CheckedOut => "checked-out",
        }
    }

    /// Localized label used in exports and reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "ยังไม่มา",
            Self::CheckedIn => "อยู่ในงาน",
            Self::CheckedOut => "กลับแล้ว",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "checked-in" => Ok(Self::CheckedIn),
            "checked-out" => Ok(Self::CheckedOut),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A recorded moment of a status transition.
///
/// `display` is the wall-clock text shown to people; `epoch_ms` is the
/// ordering key for anything that needs to sort or compare stamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// Locale-formatted wall-clock time, e.g. `09:41:07`.
    pub display: String,
    /// Milliseconds since the Unix epoch.
    pub epoch_ms: i64,
}

impl Stamp {
    /// Build a stamp from an instant, formatting it with `time_format`.
    #[must_use]
    pub fn at<Tz>(instant: &DateTime<Tz>, time_format: &str) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            display: instant.format(time_format).to_string(),
            epoch_ms: instant.timestamp_millis(),
        }
    }

    /// Stamp the current local time with the default display format.
    #[must_use]
    pub fn now() -> Self {
        Self::at(&Local::now(), DEFAULT_TIME_FORMAT)
    }
}

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Registry-assigned identifier, unique within the registry.
    pub id: u64,
    /// Name shown in lists and exports.
    pub display_name: String,
    /// Canonical phone number; the primary scan key.
    pub identifier: String,
    /// Alternate scan key, such as a student ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_identifier: Option<String>,
    /// Current attendance status.
    pub status: Status,
    /// Set when the participant checks in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_at: Option<Stamp>,
    /// Set when the participant checks out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out_at: Option<Stamp>,
    /// Free-text `"lat,lng"`; validated lazily by [`crate::geo`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Event this participant is registered for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
}

impl Participant {
    /// Create a pending participant with no stamps.
    ///
    /// The identifier is stored as given; callers normalize it first.
    #[must_use]
    pub fn new(id: u64, display_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            identifier: identifier.into(),
            secondary_identifier: None,
            status: Status::Pending,
            check_in_at: None,
            check_out_at: None,
            location: None,
            event_id: None,
        }
    }

    /// Whether `key` equals the primary identifier, or the secondary one
    /// when `include_secondary` is set.
    #[must_use]
    pub fn matches(&self, key: &str, include_secondary: bool) -> bool {
        self.identifier == key
            || (include_secondary && self.secondary_identifier.as_deref() == Some(key))
    }

    /// Whether the stamps agree with the status.
    ///
    /// `check_in_at` must be set iff the participant has arrived, and
    /// `check_out_at` iff they have left.
    #[must_use]
    pub fn timestamps_consistent(&self) -> bool {
        let arrived = matches!(self.status, Status::CheckedIn | Status::CheckedOut);
        let left = self.status == Status::CheckedOut;
        self.check_in_at.is_some() == arrived && self.check_out_at.is_some() == left
    }

    /// Re-derive stamps from the status after an administrative edit.
    ///
    /// Stamps the status does not allow are cleared; stamps it requires but
    /// that are missing are filled with `now`. Existing required stamps are
    /// kept as they are.
    pub fn reconcile_timestamps(&mut self, now: &Stamp) {
        match self.status {
            Status::Pending => {
                self.check_in_at = None;
                self.check_out_at = None;
            }
            Status::CheckedIn => {
                self.check_in_at.get_or_insert_with(|| now.clone());
                self.check_out_at = None;
            }
            Status::CheckedOut => {
                self.check_in_at.get_or_insert_with(|| now.clone());
                self.check_out_at.get_or_insert_with(|| now.clone());
            }
        }
    }

    /// Return the participant to `Pending` with no stamps.
    pub fn reset(&mut self) {
        self.status = Status::Pending;
        self.check_in_at = None;
        self.check_out_at = None;
    }
}

/// A name and raw identifier waiting to be registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParticipant {
    /// Name shown in lists and exports.
    pub display_name: String,
    /// Identifier as typed or imported; normalized on registration.
    pub identifier: String,
}

impl NewParticipant {
    /// Create a new entry.
    #[must_use]
    pub fn new(display_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            identifier: identifier.into(),
        }
    }
}

/// An event participants can be grouped under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Event name.
    pub name: String,
    /// Free-text date, as entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Venue description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
