//! Attendance exports.
//!
//! Produces the spreadsheet-friendly CSV file and a tabular text report
//! with an aggregate summary line. Both read a snapshot and never mutate
//! the registry.

use std::path::Path;

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, Table};
use csv::WriterBuilder;
use tracing::info;

use crate::error::{Error, Result};
use crate::participant::{Participant, Stamp};
use crate::stats::Stats;

/// UTF-8 byte-order mark; spreadsheet software needs it to detect UTF-8.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column headers of the CSV export.
pub const CSV_HEADER: [&str; 6] = [
    "ลำดับ",
    "ชื่อ-สกุล",
    "เบอร์โทรศัพท์",
    "สถานะ",
    "เวลาเข้า",
    "เวลาออก",
];

/// Placeholder for a stamp that has not been recorded.
const MISSING_STAMP: &str = "-";

/// Serialize participants as BOM-prefixed CSV, one row each in the given order.
///
/// # Errors
///
/// Returns an error if a row cannot be written.
pub fn export_csv(participants: &[Participant]) -> Result<Vec<u8>> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = WriterBuilder::new().from_writer(&mut buffer);
        writer.write_record(CSV_HEADER)?;

        for (index, participant) in participants.iter().enumerate() {
            let order = (index + 1).to_string();
            writer.write_record([
                order.as_str(),
                participant.display_name.as_str(),
                participant.identifier.as_str(),
                participant.status.label(),
                stamp_text(participant.check_in_at.as_ref()),
                stamp_text(participant.check_out_at.as_ref()),
            ])?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

/// Write the CSV export to `path`.
///
/// # Errors
///
/// Returns an error if serialization fails or the file cannot be written.
pub fn write_csv(path: impl AsRef<Path>, participants: &[Participant]) -> Result<()> {
    let path = path.as_ref();
    let bytes = export_csv(participants)?;
    std::fs::write(path, bytes).map_err(|source| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "Exported {} participants to {}",
        participants.len(),
        path.display()
    );
    Ok(())
}

/// One-line localized attendance summary.
#[must_use]
pub fn summary_line(stats: &Stats) -> String {
    format!(
        "ทั้งหมด {} คน | มาแล้ว {} คน ({:.1}%) | อยู่ในงาน {} | กลับแล้ว {} | ยังไม่มา {}",
        stats.total,
        stats.checked_in,
        stats.percentage,
        stats.present,
        stats.returned,
        stats.pending
    )
}

/// Build the attendance table: one row per participant, in order.
#[must_use]
pub fn participant_table(participants: &[Participant]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(CSV_HEADER.iter().map(Cell::new).collect::<Vec<_>>());

    for (index, participant) in participants.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1).set_alignment(CellAlignment::Right),
            Cell::new(&participant.display_name),
            Cell::new(&participant.identifier),
            Cell::new(participant.status.label()),
            Cell::new(stamp_text(participant.check_in_at.as_ref())),
            Cell::new(stamp_text(participant.check_out_at.as_ref())),
        ]);
    }
    table
}

/// Render a titled attendance table followed by the summary line.
#[must_use]
pub fn render_report(title: &str, participants: &[Participant], stats: &Stats) -> String {
    let table = participant_table(participants);
    format!("{title}\n{table}\n{}\n", summary_line(stats))
}

/// Write the rendered report to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_report(
    path: impl AsRef<Path>,
    title: &str,
    participants: &[Participant],
    stats: &Stats,
) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, render_report(title, participants, stats)).map_err(|source| {
        Error::FileWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!("Wrote attendance report to {}", path.display());
    Ok(())
}

fn stamp_text(stamp: Option<&Stamp>) -> &str {
    stamp.map_or(MISSING_STAMP, |s| s.display.as_str())
}
