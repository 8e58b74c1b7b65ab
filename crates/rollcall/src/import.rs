//! Participant list import.
//!
//! Turns comma-separated text, usually exported from a spreadsheet, into
//! entries ready for [`crate::registry::Registry::bulk_import`]. Import is
//! forgiving: rows without a usable name and identifier are skipped and
//! counted, never reported as errors.

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::participant::NewParticipant;

/// Lowercased words that label a header cell.
///
/// A cell is a label when it is one of these words, or one of them joined
/// to more text by a separator (`Mobile No.`, `Full Name`, `ชื่อ-สกุล`).
const HEADER_TOKENS: &[&str] = &[
    "name",
    "phone",
    "tel",
    "mobile",
    "identifier",
    "ชื่อ",
    "เบอร์",
];

/// Whole Thai header cells; Thai writes compound labels without separators.
const THAI_HEADER_LABELS: &[&str] = &[
    "ชื่อสกุล",
    "ชื่อนามสกุล",
    "เบอร์โทร",
    "เบอร์โทรศัพท์",
    "เบอร์มือถือ",
    "โทร",
    "โทรศัพท์",
];

/// Entries parsed from an import file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImport {
    /// Usable rows, in file order.
    pub entries: Vec<NewParticipant>,
    /// Rows left out because they lacked a name or identifier.
    pub skipped: usize,
    /// Whether the first row was recognised as a header and dropped.
    pub header_detected: bool,
}

/// Parse delimited text into participant entries.
///
/// The first two columns are the display name and the identifier; any
/// further columns are ignored. Identifiers are returned as written and
/// normalized later by the registry.
#[must_use]
pub fn parse_import(text: &str) -> ParsedImport {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut parsed = ParsedImport::default();
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping unreadable row {}: {}", index + 1, e);
                parsed.skipped += 1;
                continue;
            }
        };

        let fields: Vec<String> = record.iter().map(clean_field).collect();
        if index == 0 && is_header(&fields) {
            parsed.header_detected = true;
            continue;
        }

        match (fields.first(), fields.get(1)) {
            (Some(name), Some(identifier)) if !name.is_empty() && !identifier.is_empty() => {
                parsed
                    .entries
                    .push(NewParticipant::new(name.as_str(), identifier.as_str()));
            }
            _ => {
                debug!("Skipping row {} with fewer than 2 usable columns", index + 1);
                parsed.skipped += 1;
            }
        }
    }

    info!(
        "Parsed {} import rows ({} skipped)",
        parsed.entries.len(),
        parsed.skipped
    );
    parsed
}

/// Read and parse an import file.
///
/// # Errors
///
/// Returns an error if the file cannot be read as UTF-8 text.
pub fn read_import_file(path: impl AsRef<Path>) -> Result<ParsedImport> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_import(&text))
}

/// Unwrap spreadsheet escaping from a single field.
///
/// Removes a byte-order mark, one pair of surrounding double quotes and any
/// leading apostrophes (used to keep phone numbers as text).
fn clean_field(raw: &str) -> String {
    let mut field = raw.trim_start_matches('\u{feff}').trim();
    if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        field = &field[1..field.len() - 1];
    }
    field.trim_start_matches('\'').trim().to_string()
}

/// Whether the first row is a header rather than a participant.
///
/// Some cell must be a header label, and the identifier column must not
/// contain digits: a row with a phone number in it is always data.
fn is_header(fields: &[String]) -> bool {
    let identifier_has_digits = fields
        .get(1)
        .is_some_and(|field| field.chars().any(char::is_numeric));
    !identifier_has_digits && fields.iter().any(|field| is_header_label(field))
}

fn is_header_label(field: &str) -> bool {
    let lower = field.to_lowercase();
    if THAI_HEADER_LABELS.contains(&lower.as_str()) {
        return true;
    }
    HEADER_TOKENS.iter().any(|token| {
        lower == *token
            || lower
                .strip_prefix(*token)
                .is_some_and(|rest| rest.starts_with(|c: char| !c.is_alphanumeric()))
            || lower
                .strip_suffix(*token)
                .is_some_and(|rest| rest.ends_with(|c: char| !c.is_alphanumeric()))
    })
}
