//! Participant registry.
//!
//! The registry is the single owned store of participant records. Every
//! mutation goes through its API (or through [`crate::scan`], which borrows
//! it mutably), so the id and status invariants are enforced in one place.
//! Persistence is injected through [`ParticipantStore`].

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::normalize::normalize;
use crate::participant::{NewParticipant, Participant, Status};

/// What to do when a new entry's identifier is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Register the entry anyway; the first record wins on scan.
    #[default]
    Allow,
    /// Leave the entry out and count it as a duplicate.
    Skip,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Records created, in input order.
    pub imported: Vec<Participant>,
    /// Raw identifiers left out under [`DuplicatePolicy::Skip`].
    pub duplicates: Vec<String>,
}

impl ImportReport {
    /// Number of records created.
    #[must_use]
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }
}

/// Backend that can load and persist a registry snapshot.
///
/// The registry never talks to a database directly; the binary wires in
/// [`crate::storage::Storage`] and tests can use anything that holds a `Vec`.
pub trait ParticipantStore {
    /// Load every participant, in registry order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load_participants(&self) -> Result<Vec<Participant>>;

    /// Replace the stored participants with `participants`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save_participants(&mut self, participants: &[Participant]) -> Result<()>;
}

/// In-memory participant store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    participants: Vec<Participant>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from an existing list of records, keeping their order.
    #[must_use]
    pub fn from_participants(participants: Vec<Participant>) -> Self {
        Self { participants }
    }

    /// Load a registry from a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load_from(store: &impl ParticipantStore) -> Result<Self> {
        let participants = store.load_participants()?;
        debug!("Loaded {} participants", participants.len());
        Ok(Self::from_participants(participants))
    }

    /// Persist the current snapshot to a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn save_to(&self, store: &mut impl ParticipantStore) -> Result<()> {
        store.save_participants(&self.participants)?;
        debug!("Saved {} participants", self.participants.len());
        Ok(())
    }

    /// The id the next registered participant will receive.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.participants.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    /// Register a single participant.
    ///
    /// The identifier is normalized and the record starts out pending.
    pub fn add(&mut self, display_name: &str, identifier: &str) -> Participant {
        let participant = Participant::new(self.next_id(), display_name, normalize(identifier));
        debug!(
            "Registered participant {} ({})",
            participant.id, participant.identifier
        );
        self.participants.push(participant.clone());
        participant
    }

    /// Register many participants with a contiguous block of ids.
    ///
    /// Input order is preserved and every entry is created, duplicates
    /// included.
    pub fn bulk_import(&mut self, entries: &[NewParticipant]) -> Vec<Participant> {
        self.bulk_import_with_policy(entries, DuplicatePolicy::Allow)
            .imported
    }

    /// Register many participants, applying a duplicate-identifier policy.
    ///
    /// Duplicates are checked against both existing records and earlier
    /// entries of the same batch.
    pub fn bulk_import_with_policy(
        &mut self,
        entries: &[NewParticipant],
        policy: DuplicatePolicy,
    ) -> ImportReport {
        let mut next_id = self.next_id();
        let mut seen: HashSet<String> = self
            .participants
            .iter()
            .map(|p| p.identifier.clone())
            .collect();
        let mut report = ImportReport::default();

        for entry in entries {
            let identifier = normalize(&entry.identifier);
            let is_new = seen.insert(identifier.clone());
            if !is_new && policy == DuplicatePolicy::Skip {
                debug!("Skipping duplicate identifier {}", identifier);
                report.duplicates.push(entry.identifier.clone());
                continue;
            }

            let participant = Participant::new(next_id, entry.display_name.as_str(), identifier);
            next_id += 1;
            self.participants.push(participant.clone());
            report.imported.push(participant);
        }

        info!(
            "Imported {} participants ({} duplicates skipped)",
            report.imported.len(),
            report.duplicates.len()
        );
        report
    }

    /// Replace the record with the same id wholesale.
    ///
    /// This is the administrative edit path: no status or timestamp
    /// invariant is checked here. Returns `false` if no record has that id.
    pub fn update(&mut self, participant: Participant) -> bool {
        let Some(slot) = self.participants.iter_mut().find(|p| p.id == participant.id) else {
            return false;
        };
        if !participant.timestamps_consistent() {
            warn!(
                "Participant {} saved with stamps that disagree with status {}",
                participant.id, participant.status
            );
        }
        *slot = participant;
        true
    }

    /// Return every participant to pending and clear all stamps.
    pub fn reset_session(&mut self) {
        for participant in &mut self.participants {
            participant.reset();
        }
        info!("Reset session for {} participants", self.participants.len());
    }

    /// Remove every participant.
    pub fn clear_all(&mut self) {
        let count = self.participants.len();
        self.participants.clear();
        info!("Cleared {} participants", count);
    }

    /// Look up a participant by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// First participant whose identifier (or secondary identifier, when
    /// `include_secondary` is set) equals `key`.
    #[must_use]
    pub fn find_by_identifier(&self, key: &str, include_secondary: bool) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.matches(key, include_secondary))
    }

    pub(crate) fn find_by_identifier_mut(
        &mut self,
        key: &str,
        include_secondary: bool,
    ) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.matches(key, include_secondary))
    }

    /// Iterate participants in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    /// Borrow the participants as a slice.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Copy the current participant list.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Participant> {
        self.participants.clone()
    }

    /// Number of participants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the registry holds no participants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participants with the given status.
    pub fn filter_by_status(&self, status: Status) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(move |p| p.status == status)
    }

    /// Participants registered for the given event.
    pub fn in_event(&self, event_id: i64) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(move |p| p.event_id == Some(event_id))
    }

    /// Identifiers shared by more than one record, with the ids sharing them.
    #[must_use]
    pub fn duplicate_identifiers(&self) -> BTreeMap<String, Vec<u64>> {
        let mut by_identifier: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for participant in &self.participants {
            by_identifier
                .entry(participant.identifier.clone())
                .or_default()
                .push(participant.id);
        }
        by_identifier.retain(|_, ids| ids.len() > 1);
        by_identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Stamp;

    fn stamp(display: &str) -> Stamp {
        Stamp {
            display: display.to_string(),
            epoch_ms: 0,
        }
    }

    fn entries(rows: &[(&str, &str)]) -> Vec<NewParticipant> {
        rows.iter()
            .map(|(name, id)| NewParticipant::new(*name, *id))
            .collect()
    }

    #[derive(Default)]
    struct VecStore {
        rows: Vec<Participant>,
    }

    impl ParticipantStore for VecStore {
        fn load_participants(&self) -> Result<Vec<Participant>> {
            Ok(self.rows.clone())
        }

        fn save_participants(&mut self, participants: &[Participant]) -> Result<()> {
            self.rows = participants.to_vec();
            Ok(())
        }
    }

    #[test]
    fn test_add_assigns_sequential_ids() {
        let mut registry = Registry::new();
        assert_eq!(registry.add("A", "0811111111").id, 1);
        assert_eq!(registry.add("B", "0822222222").id, 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_add_normalizes_identifier() {
        let mut registry = Registry::new();
        let p = registry.add("Somchai", "๐๘๑-๒๓๔ ๕๖๗๘");
        assert_eq!(p.identifier, "0812345678");
        assert_eq!(p.status, Status::Pending);
    }

    #[test]
    fn test_next_id_follows_max_existing() {
        let registry = Registry::from_participants(vec![
            Participant::new(5, "A", "1"),
            Participant::new(2, "B", "2"),
        ]);
        assert_eq!(registry.next_id(), 6);
        assert_eq!(Registry::new().next_id(), 1);
    }

    #[test]
    fn test_bulk_import_contiguous_ids_in_order() {
        let mut registry = Registry::new();
        let imported = registry.bulk_import(&entries(&[
            ("A", "081-111-1111"),
            ("B", "0822222222"),
            ("C", "๐๘๓๓๓๓๓๓๓๓"),
        ]));

        let ids: Vec<u64> = imported.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(imported[0].display_name, "A");
        assert_eq!(imported[0].identifier, "0811111111");
        assert_eq!(imported[2].identifier, "0833333333");
    }

    #[test]
    fn test_bulk_import_continues_after_existing() {
        let mut registry = Registry::new();
        registry.add("A", "1");
        let imported = registry.bulk_import(&entries(&[("B", "2"), ("C", "3")]));
        assert_eq!(imported[0].id, 2);
        assert_eq!(imported[1].id, 3);
    }

    #[test]
    fn test_bulk_import_allows_duplicates() {
        let mut registry = Registry::new();
        registry.add("A", "0811111111");
        let imported = registry.bulk_import(&entries(&[("B", "081-111-1111")]));
        assert_eq!(imported.len(), 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.duplicate_identifiers().len(), 1);
    }

    #[test]
    fn test_bulk_import_skip_policy() {
        crate::logging::init_test_logging();
        let mut registry = Registry::new();
        registry.add("A", "0811111111");
        let report = registry.bulk_import_with_policy(
            &entries(&[("B", "081-111-1111"), ("C", "0822222222"), ("D", "0822222222")]),
            DuplicatePolicy::Skip,
        );

        assert_eq!(report.imported_count(), 1);
        assert_eq!(report.imported[0].id, 2);
        assert_eq!(report.duplicates, vec!["081-111-1111", "0822222222"]);
        assert!(registry.duplicate_identifiers().is_empty());
    }

    #[test]
    fn test_update_replaces_whole_record() {
        let mut registry = Registry::new();
        let mut p = registry.add("A", "0811111111");
        p.display_name = "Renamed".to_string();
        p.status = Status::CheckedOut;

        assert!(registry.update(p.clone()));
        assert_eq!(registry.get(p.id), Some(&p));
    }

    #[test]
    fn test_update_unknown_id() {
        let mut registry = Registry::new();
        registry.add("A", "0811111111");
        assert!(!registry.update(Participant::new(99, "X", "0")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reset_session_preserves_identity() {
        crate::logging::init_test_logging();
        let mut registry = Registry::new();
        registry.bulk_import(&entries(&[("A", "1"), ("B", "2"), ("C", "3")]));

        let mut b = registry.get(2).cloned().unwrap();
        b.status = Status::CheckedIn;
        b.check_in_at = Some(stamp("09:00:00"));
        registry.update(b);

        let mut c = registry.get(3).cloned().unwrap();
        c.status = Status::CheckedOut;
        c.check_in_at = Some(stamp("09:00:00"));
        c.check_out_at = Some(stamp("10:00:00"));
        registry.update(c);

        let before = registry.snapshot();
        registry.reset_session();

        for (old, new) in before.iter().zip(registry.iter()) {
            assert_eq!(old.id, new.id);
            assert_eq!(old.display_name, new.display_name);
            assert_eq!(old.identifier, new.identifier);
            assert_eq!(new.status, Status::Pending);
            assert!(new.check_in_at.is_none());
            assert!(new.check_out_at.is_none());
        }
    }

    #[test]
    fn test_clear_all() {
        let mut registry = Registry::new();
        registry.add("A", "1");
        registry.clear_all();
        assert!(registry.is_empty());
        assert_eq!(registry.next_id(), 1);
    }

    #[test]
    fn test_find_by_identifier_first_match_wins() {
        let mut registry = Registry::new();
        registry.add("First", "0811111111");
        registry.add("Second", "0811111111");
        let found = registry.find_by_identifier("0811111111", true).unwrap();
        assert_eq!(found.display_name, "First");
    }

    #[test]
    fn test_filters() {
        let mut registry = Registry::new();
        registry.add("A", "1");
        let mut b = registry.add("B", "2");
        b.status = Status::CheckedIn;
        b.event_id = Some(4);
        registry.update(b);

        assert_eq!(registry.filter_by_status(Status::Pending).count(), 1);
        assert_eq!(registry.filter_by_status(Status::CheckedIn).count(), 1);
        assert_eq!(registry.in_event(4).count(), 1);
        assert_eq!(registry.in_event(5).count(), 0);
    }

    #[test]
    fn test_load_and_save_through_store() {
        let mut store = VecStore::default();
        let mut registry = Registry::new();
        registry.add("A", "1");
        registry.add("B", "2");
        registry.save_to(&mut store).unwrap();

        let loaded = Registry::load_from(&store).unwrap();
        assert_eq!(loaded, registry);
    }
}
