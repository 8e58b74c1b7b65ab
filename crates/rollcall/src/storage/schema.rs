//! `SQLite` schema definitions for rollcall.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the participants table.
///
/// `id` is assigned by the registry, not by `SQLite`; `position` keeps
/// registry order across saves. Each stamp is stored as its display text
/// and its epoch-millisecond ordering key.
pub const CREATE_PARTICIPANTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS participants (
    id INTEGER PRIMARY KEY,
    position INTEGER NOT NULL,
    display_name TEXT NOT NULL,
    identifier TEXT NOT NULL,
    secondary_identifier TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    check_in_display TEXT,
    check_in_epoch_ms INTEGER,
    check_out_display TEXT,
    check_out_epoch_ms INTEGER,
    location TEXT,
    event_id INTEGER
)
";

/// SQL statement to create an index on identifier for scan lookups.
pub const CREATE_IDENTIFIER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_participants_identifier ON participants(identifier)
";

/// SQL statement to create an index on `event_id` for event filtering.
pub const CREATE_EVENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_participants_event ON participants(event_id)
";

/// SQL statement to create the events table.
///
/// Participants reference events without a foreign key constraint:
/// deleting an event leaves its participants in place.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    date TEXT,
    location TEXT,
    description TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_PARTICIPANTS_TABLE,
    CREATE_IDENTIFIER_INDEX,
    CREATE_EVENT_INDEX,
    CREATE_EVENTS_TABLE,
    CREATE_METADATA_TABLE,
];
