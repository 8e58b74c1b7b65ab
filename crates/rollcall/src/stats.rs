//! Attendance statistics.
//!
//! Stats are a pure view over a registry snapshot. They are recomputed on
//! every request and never stored.

use serde::{Deserialize, Serialize};

use crate::participant::{Participant, Status};

/// Attendance counts derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Number of participants.
    pub total: usize,
    /// Currently checked in.
    pub present: usize,
    /// Checked in and then checked out.
    pub returned: usize,
    /// Arrived at some point: `present + returned`.
    pub checked_in: usize,
    /// Not yet arrived: `total - checked_in`.
    pub pending: usize,
    /// `checked_in / total * 100`, or 0 for an empty snapshot.
    pub percentage: f64,
}

/// Compute stats over `participants` in one pass.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_stats(participants: &[Participant]) -> Stats {
    let mut present = 0;
    let mut returned = 0;
    for participant in participants {
        match participant.status {
            Status::CheckedIn => present += 1,
            Status::CheckedOut => returned += 1,
            Status::Pending => {}
        }
    }

    let total = participants.len();
    let checked_in = present + returned;
    let percentage = if total == 0 {
        0.0
    } else {
        checked_in as f64 / total as f64 * 100.0
    };

    Stats {
        total,
        present,
        returned,
        checked_in,
        pending: total - checked_in,
        percentage,
    }
}
