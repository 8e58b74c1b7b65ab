//! Storage layer for rollcall.
//!
//! This module provides `SQLite`-based persistence for the participant
//! registry and the event list. The registry itself stays in memory; this
//! store is injected through [`ParticipantStore`] and written as a whole
//! after each mutation.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::participant::{Event, Participant, Stamp, Status};
use crate::registry::{ParticipantStore, Registry};

/// How long a writer waits for another process to finish its transaction.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const PARTICIPANT_COLUMNS: &str = r"
    id, display_name, identifier, secondary_identifier, status,
    check_in_display, check_in_epoch_ms, check_out_display, check_out_epoch_ms,
    location, event_id
";

/// Storage engine for participants and events.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Whole-registry saves inside a single transaction
/// - Registry order preserved across loads
/// - Event creation, lookup and removal
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

/// A participant row before its status has been validated.
struct ParticipantRow {
    id: i64,
    display_name: String,
    identifier: String,
    secondary_identifier: Option<String>,
    status: String,
    check_in: (Option<String>, Option<i64>),
    check_out: (Option<String>, Option<i64>),
    location: Option<String>,
    event_id: Option<i64>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets a report read while a station is writing.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count stored participants.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn participant_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM participants", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Run `f` against the current stored registry and save its changes.
    ///
    /// The load, `f` and the save happen inside one `BEGIN IMMEDIATE`
    /// transaction, so another process sharing the database cannot write
    /// in between. The registry is only written back if `f` changed it, and
    /// nothing is written when `f` fails.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a storage error if the registry
    /// cannot be loaded or saved.
    pub fn update_registry<T, E>(
        &mut self,
        f: impl FnOnce(&mut Registry) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<Error>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::from)?;

        let loaded = read_participants(&tx)?;
        let mut registry = Registry::from_participants(loaded.clone());
        let value = f(&mut registry)?;

        if registry.participants() != loaded.as_slice() {
            write_participants(&tx, registry.participants())?;
            debug!("Saved {} participants", registry.len());
        }
        tx.commit().map_err(Error::from)?;
        Ok(value)
    }

    // === Events ===

    /// Create an event and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn add_event(
        &self,
        name: &str,
        date: Option<&str>,
        location: Option<&str>,
        description: Option<&str>,
    ) -> Result<Event> {
        self.conn.execute(
            "INSERT INTO events (name, date, location, description) VALUES (?1, ?2, ?3, ?4)",
            params![name, date, location, description],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted event with id {}", id);
        Ok(Event {
            id,
            name: name.to_string(),
            date: date.map(str::to_string),
            location: location.map(str::to_string),
            description: description.map(str::to_string),
        })
    }

    /// List all events in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_events(&self) -> Result<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, date, location, description FROM events ORDER BY id")?;

        let events = stmt
            .query_map([], Self::row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }

    /// Get an event by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_event(&self, id: i64) -> Result<Option<Event>> {
        let event = self
            .conn
            .query_row(
                "SELECT id, name, date, location, description FROM events WHERE id = ?1",
                [id],
                Self::row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    /// Delete an event.
    ///
    /// Participants that reference the event keep their `event_id`.
    /// Returns `true` if an event was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_event(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Get statistics about the storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let participants = self.participant_count()?;
        let events: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            participants,
            events,
            schema_version: migrations::schema_version(&self.conn)?,
            db_size_bytes,
        })
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<Event> {
        Ok(Event {
            id: row.get(0)?,
            name: row.get(1)?,
            date: row.get(2)?,
            location: row.get(3)?,
            description: row.get(4)?,
        })
    }

    fn row_to_participant(row: &rusqlite::Row) -> rusqlite::Result<ParticipantRow> {
        Ok(ParticipantRow {
            id: row.get(0)?,
            display_name: row.get(1)?,
            identifier: row.get(2)?,
            secondary_identifier: row.get(3)?,
            status: row.get(4)?,
            check_in: (row.get(5)?, row.get(6)?),
            check_out: (row.get(7)?, row.get(8)?),
            location: row.get(9)?,
            event_id: row.get(10)?,
        })
    }
}

impl ParticipantStore for Storage {
    fn load_participants(&self) -> Result<Vec<Participant>> {
        read_participants(&self.conn)
    }

    fn save_participants(&mut self, participants: &[Participant]) -> Result<()> {
        let tx = self.conn.transaction()?;
        write_participants(&tx, participants)?;
        tx.commit()?;

        debug!("Saved {} participants", participants.len());
        Ok(())
    }
}

fn read_participants(conn: &Connection) -> Result<Vec<Participant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM participants ORDER BY position"
    ))?;

    let rows = stmt
        .query_map([], Storage::row_to_participant)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(ParticipantRow::into_participant).collect()
}

fn write_participants(conn: &Connection, participants: &[Participant]) -> Result<()> {
    conn.execute("DELETE FROM participants", [])?;
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO participants (position, {PARTICIPANT_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ))?;

    for (position, participant) in (0_i64..).zip(participants) {
        let id = i64::try_from(participant.id).map_err(|_| {
            Error::corrupt_record(
                "participants",
                format!("id {} out of range", participant.id),
            )
        })?;
        let (in_display, in_epoch) = stamp_columns(participant.check_in_at.as_ref());
        let (out_display, out_epoch) = stamp_columns(participant.check_out_at.as_ref());

        stmt.execute(params![
            position,
            id,
            participant.display_name,
            participant.identifier,
            participant.secondary_identifier,
            participant.status.as_str(),
            in_display,
            in_epoch,
            out_display,
            out_epoch,
            participant.location,
            participant.event_id,
        ])?;
    }
    Ok(())
}

impl ParticipantRow {
    fn into_participant(self) -> Result<Participant> {
        let id = u64::try_from(self.id).map_err(|_| {
            Error::corrupt_record("participants", format!("negative id {}", self.id))
        })?;
        let status = self.status.parse::<Status>().map_err(|e| {
            Error::corrupt_record("participants", format!("participant {id}: {e}"))
        })?;

        Ok(Participant {
            id,
            display_name: self.display_name,
            identifier: self.identifier,
            secondary_identifier: self.secondary_identifier,
            status,
            check_in_at: stamp_from_columns(self.check_in),
            check_out_at: stamp_from_columns(self.check_out),
            location: self.location,
            event_id: self.event_id,
        })
    }
}

fn stamp_columns(stamp: Option<&Stamp>) -> (Option<&str>, Option<i64>) {
    stamp.map_or((None, None), |s| (Some(s.display.as_str()), Some(s.epoch_ms)))
}

/// Rebuild a stamp; a display text without an epoch sorts first.
fn stamp_from_columns((display, epoch_ms): (Option<String>, Option<i64>)) -> Option<Stamp> {
    display.map(|display| Stamp {
        display,
        epoch_ms: epoch_ms.unwrap_or_default(),
    })
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of participants stored.
    pub participants: i64,
    /// Total number of events stored.
    pub events: i64,
    /// Schema version recorded in the metadata table.
    pub schema_version: i32,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanOutcome;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn stamp(display: &str, epoch_ms: i64) -> Stamp {
        Stamp {
            display: display.to_string(),
            epoch_ms,
        }
    }

    fn sample() -> Vec<Participant> {
        let pending = Participant::new(3, "Somchai", "0812345678");

        let mut present = Participant::new(1, "Somsri", "0898765432");
        present.status = Status::CheckedIn;
        present.check_in_at = Some(stamp("09:00:00", 1_000));
        present.secondary_identifier = Some("S6401".to_string());
        present.location = Some("13.7563,100.5018".to_string());
        present.event_id = Some(2);

        let mut returned = Participant::new(2, "Jaidee", "0811111111");
        returned.status = Status::CheckedOut;
        returned.check_in_at = Some(stamp("09:05:00", 2_000));
        returned.check_out_at = Some(stamp("16:00:00", 3_000));

        vec![pending, present, returned]
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path(), Path::new(":memory:"));
    }

    #[test]
    fn test_load_empty() {
        let storage = create_test_storage();
        assert!(storage.load_participants().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_preserves_order_and_fields() {
        let mut storage = create_test_storage();
        let participants = sample();

        storage.save_participants(&participants).unwrap();
        let loaded = storage.load_participants().unwrap();

        assert_eq!(loaded, participants);
    }

    #[test]
    fn test_save_replaces_previous_contents() {
        let mut storage = create_test_storage();
        storage.save_participants(&sample()).unwrap();

        let only = vec![Participant::new(9, "Solo", "0800000000")];
        storage.save_participants(&only).unwrap();

        assert_eq!(storage.load_participants().unwrap(), only);
        assert_eq!(storage.participant_count().unwrap(), 1);
    }

    #[test]
    fn test_unknown_status_is_corrupt_record() {
        let mut storage = create_test_storage();
        storage.save_participants(&sample()).unwrap();
        storage
            .conn
            .execute("UPDATE participants SET status = 'present' WHERE id = 3", [])
            .unwrap();

        let err = storage.load_participants().unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { .. }));
        assert!(err.to_string().contains("present"));
    }

    #[test]
    fn test_stamp_without_epoch_loads() {
        let mut storage = create_test_storage();
        storage.save_participants(&sample()).unwrap();
        storage
            .conn
            .execute(
                "UPDATE participants SET check_in_epoch_ms = NULL WHERE id = 1",
                [],
            )
            .unwrap();

        let loaded = storage.load_participants().unwrap();
        let present = loaded.iter().find(|p| p.id == 1).unwrap();
        assert_eq!(present.check_in_at, Some(stamp("09:00:00", 0)));
    }

    #[test]
    fn test_update_registry_saves_changes() {
        let mut storage = create_test_storage();
        let added = storage
            .update_registry(|registry| Ok::<_, Error>(registry.add("Somchai", "081-234-5678")))
            .unwrap();

        let loaded = storage.load_participants().unwrap();
        assert_eq!(loaded, vec![added]);
    }

    #[test]
    fn test_update_registry_discards_changes_on_error() {
        let mut storage = create_test_storage();
        let result = storage.update_registry(|registry| {
            registry.add("Somchai", "0812345678");
            Err::<(), Error>(Error::ParticipantNotFound { id: 9 })
        });

        assert!(matches!(result, Err(Error::ParticipantNotFound { id: 9 })));
        assert!(storage.load_participants().unwrap().is_empty());
    }

    #[test]
    fn test_update_registry_sees_writes_from_other_handles() {
        let dir = std::env::temp_dir().join(format!("rollcall_shared_{}", std::process::id()));
        let path = dir.join("attendance.db");
        let mut first = Storage::open(&path).unwrap();
        let mut second = Storage::open(&path).unwrap();

        first
            .update_registry(|registry| {
                registry.add("A", "0811111111");
                registry.add("B", "0822222222");
                Ok::<_, Error>(())
            })
            .unwrap();

        let scan = |storage: &mut Storage, key: &str| {
            storage
                .update_registry(|registry| Ok::<_, Error>(registry.scan(key)))
                .unwrap()
        };

        assert!(matches!(scan(&mut second, "0811111111"), ScanOutcome::CheckedIn(_)));
        assert!(matches!(scan(&mut first, "0822222222"), ScanOutcome::CheckedIn(_)));
        assert!(matches!(scan(&mut first, "0811111111"), ScanOutcome::CheckedOut(_)));

        let statuses: Vec<Status> = second
            .load_participants()
            .unwrap()
            .iter()
            .map(|p| p.status)
            .collect();
        assert_eq!(statuses, vec![Status::CheckedOut, Status::CheckedIn]);

        drop(first);
        drop(second);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_add_and_get_event() {
        let storage = create_test_storage();
        let event = storage
            .add_event("Reunion", Some("2024-03-01"), Some("Hall A"), None)
            .unwrap();

        let fetched = storage.get_event(event.id).unwrap();
        assert_eq!(fetched, Some(event));
    }

    #[test]
    fn test_get_nonexistent_event() {
        let storage = create_test_storage();
        assert!(storage.get_event(99999).unwrap().is_none());
    }

    #[test]
    fn test_list_events_in_creation_order() {
        let storage = create_test_storage();
        storage.add_event("First", None, None, None).unwrap();
        storage.add_event("Second", None, None, None).unwrap();

        let names: Vec<String> = storage
            .list_events()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_delete_event_keeps_participants() {
        let mut storage = create_test_storage();
        let event = storage.add_event("Reunion", None, None, None).unwrap();

        let mut p = Participant::new(1, "Somchai", "0812345678");
        p.event_id = Some(event.id);
        storage.save_participants(&[p]).unwrap();

        assert!(storage.delete_event(event.id).unwrap());
        assert!(!storage.delete_event(event.id).unwrap());

        let loaded = storage.load_participants().unwrap();
        assert_eq!(loaded[0].event_id, Some(event.id));
    }

    #[test]
    fn test_stats() {
        let mut storage = create_test_storage();
        storage.save_participants(&sample()).unwrap();
        storage.add_event("Reunion", None, None, None).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.participants, 3);
        assert_eq!(stats.events, 1);
        assert_eq!(stats.schema_version, migrations::CURRENT_VERSION);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_open_file_database_persists() {
        let dir = std::env::temp_dir().join(format!("rollcall_storage_{}", std::process::id()));
        let path = dir.join("nested").join("attendance.db");

        {
            let mut storage = Storage::open(&path).unwrap();
            storage.save_participants(&sample()).unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.load_participants().unwrap(), sample());
        assert!(storage.stats().unwrap().db_size_bytes > 0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
