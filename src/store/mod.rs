//! ReconcilingStore - the client-side view of one server collection.
//!
//! Three inputs feed the store: full snapshots (initial fetch and polling),
//! `created` push events and `updated` push events. The store merges them
//! into one de-duplicated collection and keeps per-key transient local state
//! (UI-only input such as a pending due date) alive across merges.
//!
//! The store is a plain state machine: it performs no I/O and is not
//! synchronized. Callers serialize access to one instance (see
//! [`LiveCollection`](crate::LiveCollection)) so events are applied in
//! receipt order.
//!
//! ## Refresh tickets
//!
//! A fetch completes some time after it was issued, and push events may be
//! applied in between. To keep those newer events from being rolled back by
//! the older snapshot, callers bracket a fetch with
//! [`begin_refresh`](ReconcilingStore::begin_refresh) and
//! [`complete_refresh`](ReconcilingStore::complete_refresh): records pushed
//! while the ticket is open are replayed on top of the snapshot, and so are
//! local writes (optimistic bodies, removals and their rollbacks). A ticket
//! superseded by a newer one is discarded.
//!
//! ```ignore
//! let mut store: ReconcilingStore<Reservation, ReservationLocal> = ReconcilingStore::new();
//! let ticket = store.begin_refresh();
//! let records = source.fetch_all()?;
//! store.complete_refresh(ticket, records);
//! ```

mod order;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::record::Record;

pub use order::OrderPolicy;

/// A held record plus its transient local state.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<R, L> {
    pub record: R,
    pub local: L,
}

/// Outcome of applying one pushed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The key was new and the record was inserted.
    Inserted,
    /// The held record was replaced.
    Replaced,
    /// The incoming record carried an older version and was ignored.
    Stale,
    /// The record failed the visibility filter and was not inserted.
    Hidden,
}

/// Where records that appear through push events are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertAt {
    /// Most recent first.
    #[default]
    Front,
    Back,
}

/// Handle for one in-flight fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

/// Counts describing what a snapshot merge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotSummary {
    pub inserted: usize,
    pub replaced: usize,
    pub removed: usize,
    /// Snapshot records older than the held version, ignored.
    pub stale: usize,
    /// Pushed records and local writes replayed on top of the snapshot.
    pub replayed: usize,
}

/// An entry taken out by [`ReconcilingStore::remove`], restorable on rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed<R, L> {
    pub position: usize,
    pub entry: Entry<R, L>,
}

/// A change applied while a refresh is open, replayed on its snapshot.
#[derive(Debug, Clone)]
enum Journaled<R, L> {
    Merge(R),
    Overwrite(R),
    Remove(String),
    Restore(Removed<R, L>),
}

/// Merges snapshots and push events into one collection.
pub struct ReconcilingStore<R, L = ()> {
    entries: Vec<Entry<R, L>>,
    index: HashMap<String, usize>,
    order: OrderPolicy<R>,
    insert_at: InsertAt,
    visible: Option<fn(&R) -> bool>,
    revision: u64,
    generation: u64,
    refreshing: bool,
    journal: Vec<Journaled<R, L>>,
}

impl<R: Record, L: Default + Clone> Default for ReconcilingStore<R, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record, L: Default + Clone> ReconcilingStore<R, L> {
    /// Create an empty store keeping server order.
    pub fn new() -> Self {
        ReconcilingStore {
            entries: Vec::new(),
            index: HashMap::new(),
            order: OrderPolicy::ServerOrder,
            insert_at: InsertAt::Front,
            visible: None,
            revision: 0,
            generation: 0,
            refreshing: false,
            journal: Vec::new(),
        }
    }

    pub fn with_order(mut self, order: OrderPolicy<R>) -> Self {
        self.order = order;
        self
    }

    pub fn with_insert_at(mut self, insert_at: InsertAt) -> Self {
        self.insert_at = insert_at;
        self
    }

    /// Only hold records for which `visible` returns true.
    ///
    /// Applies to snapshots and to insertions from push events. A held record
    /// that stops matching stays until the next snapshot.
    pub fn with_filter(mut self, visible: fn(&R) -> bool) -> Self {
        self.visible = Some(visible);
        self
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The collection, ordered by the store's policy.
    pub fn snapshot(&self) -> Vec<Entry<R, L>> {
        let mut entries = self.entries.clone();
        self.order.arrange(&mut entries);
        entries
    }

    /// The ordered records without local state.
    pub fn records(&self) -> Vec<R> {
        self.snapshot().into_iter().map(|e| e.record).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Entry<R, L>> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Incremented on every change; used to memoize derived aggregates.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Replace the collection wholesale and clear all local state.
    pub fn reset(&mut self, records: Vec<R>) {
        self.entries = self
            .dedupe(records)
            .into_iter()
            .map(|record| Entry {
                record,
                local: L::default(),
            })
            .collect();
        self.reindex();
        self.revision += 1;
        debug!(
            collection = R::COLLECTION,
            len = self.entries.len(),
            "collection reset"
        );
    }

    /// Merge an authoritative full snapshot.
    ///
    /// Local state survives for keys present before and after, is dropped
    /// for keys the snapshot omits and starts at `L::default()` for new keys.
    /// The snapshot's order becomes the held order.
    pub fn apply_full_snapshot(&mut self, records: Vec<R>) -> SnapshotSummary {
        let mut summary = SnapshotSummary::default();
        let mut held: HashMap<String, Entry<R, L>> = self
            .entries
            .drain(..)
            .map(|e| (e.record.id().to_string(), e))
            .collect();

        let mut merged = Vec::with_capacity(records.len());
        for record in self.dedupe(records) {
            match held.remove(record.id()) {
                Some(mut entry) => {
                    if is_older(&record, &entry.record) {
                        summary.stale += 1;
                    } else {
                        entry.record = record;
                        summary.replaced += 1;
                    }
                    merged.push(entry);
                }
                None => {
                    summary.inserted += 1;
                    merged.push(Entry {
                        record,
                        local: L::default(),
                    });
                }
            }
        }

        summary.removed = held.len();
        self.entries = merged;
        self.reindex();
        self.revision += 1;
        debug!(
            collection = R::COLLECTION,
            inserted = summary.inserted,
            replaced = summary.replaced,
            removed = summary.removed,
            stale = summary.stale,
            "snapshot merged"
        );
        summary
    }

    /// Open a refresh. Push records and local writes applied until it
    /// completes are journaled.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        self.refreshing = true;
        // Anything pushed before this point is covered by the new fetch.
        self.journal.clear();
        RefreshTicket {
            generation: self.generation,
        }
    }

    /// Merge the snapshot fetched under `ticket`.
    ///
    /// Returns `None` when a newer refresh superseded the ticket; the records
    /// are discarded.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        records: Vec<R>,
    ) -> Option<SnapshotSummary> {
        if !self.owns(ticket) {
            debug!(collection = R::COLLECTION, "superseded refresh discarded");
            return None;
        }
        let mut summary = self.apply_full_snapshot(records);
        summary.replayed = self.replay_journal();
        Some(summary)
    }

    /// Like [`complete_refresh`](Self::complete_refresh) but replaces the
    /// collection wholesale and clears local state.
    pub fn complete_reset(&mut self, ticket: RefreshTicket, records: Vec<R>) -> bool {
        if !self.owns(ticket) {
            debug!(collection = R::COLLECTION, "superseded reset discarded");
            return false;
        }
        self.reset(records);
        self.replay_journal();
        true
    }

    /// Close a refresh whose fetch failed. The held collection is untouched.
    pub fn abandon_refresh(&mut self, ticket: RefreshTicket) {
        if self.owns(ticket) {
            self.refreshing = false;
            self.journal.clear();
        }
    }

    fn owns(&self, ticket: RefreshTicket) -> bool {
        self.refreshing && ticket.generation == self.generation
    }

    fn replay_journal(&mut self) -> usize {
        self.refreshing = false;
        let journal = std::mem::take(&mut self.journal);
        let replayed = journal.len();
        for change in journal {
            match change {
                Journaled::Merge(record) => {
                    self.merge_update(record);
                }
                Journaled::Overwrite(record) => {
                    self.restore_record(record);
                }
                Journaled::Remove(id) => {
                    self.remove(&id);
                }
                Journaled::Restore(removed) => {
                    self.restore(removed);
                }
            }
        }
        replayed
    }

    // ------------------------------------------------------------------
    // Push events
    // ------------------------------------------------------------------

    /// Apply a `created` event. A key already held is treated as an update,
    /// so duplicate deliveries are idempotent.
    pub fn apply_created(&mut self, record: R) -> Applied {
        self.journal_if_refreshing(|| Journaled::Merge(record.clone()));
        if self.contains(record.id()) {
            self.merge_update(record)
        } else {
            self.insert(record)
        }
    }

    /// Apply an `updated` event. Nested fields marked for retention keep
    /// their prior value when the payload omits them; an unseen key is
    /// inserted as if created.
    pub fn apply_updated(&mut self, record: R) -> Applied {
        self.journal_if_refreshing(|| Journaled::Merge(record.clone()));
        self.merge_update(record)
    }

    fn journal_if_refreshing(&mut self, change: impl FnOnce() -> Journaled<R, L>) {
        if self.refreshing {
            self.journal.push(change());
        }
    }

    fn merge_update(&mut self, mut record: R) -> Applied {
        let Some(&pos) = self.index.get(record.id()) else {
            return self.insert(record);
        };

        let entry = &mut self.entries[pos];
        if is_older(&record, &entry.record) {
            debug!(
                collection = R::COLLECTION,
                id = record.id(),
                "stale update ignored"
            );
            return Applied::Stale;
        }
        record.retain_from(&entry.record);
        entry.record = record;
        self.revision += 1;
        Applied::Replaced
    }

    fn insert(&mut self, record: R) -> Applied {
        if !self.is_visible(&record) {
            return Applied::Hidden;
        }
        let entry = Entry {
            record,
            local: L::default(),
        };
        match self.insert_at {
            InsertAt::Front => self.entries.insert(0, entry),
            InsertAt::Back => self.entries.push(entry),
        }
        self.reindex();
        self.revision += 1;
        Applied::Inserted
    }

    // ------------------------------------------------------------------
    // Local state and local writes
    // ------------------------------------------------------------------

    /// Mutate the local state for `id`. Never touches the record body.
    /// Returns false when the key is not held.
    pub fn set_local(&mut self, id: &str, update: impl FnOnce(&mut L)) -> bool {
        match self.index.get(id) {
            Some(&pos) => {
                update(&mut self.entries[pos].local);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Overwrite the body held for `id` without merging or version checks.
    /// Used to apply and roll back optimistic writes.
    pub fn restore_record(&mut self, record: R) -> bool {
        self.journal_if_refreshing(|| Journaled::Overwrite(record.clone()));
        match self.index.get(record.id()) {
            Some(&pos) => {
                self.entries[pos].record = record;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Remove a key and its local state.
    pub fn remove(&mut self, id: &str) -> Option<Removed<R, L>> {
        let position = self.index.get(id).copied()?;
        self.journal_if_refreshing(|| Journaled::Remove(id.to_string()));
        let entry = self.entries.remove(position);
        self.reindex();
        self.revision += 1;
        Some(Removed { position, entry })
    }

    /// Put back an entry taken out by [`remove`](Self::remove).
    ///
    /// Does nothing if the key reappeared in the meantime.
    pub fn restore(&mut self, removed: Removed<R, L>) -> bool {
        if self.contains(removed.entry.record.id()) {
            return false;
        }
        self.journal_if_refreshing(|| Journaled::Restore(removed.clone()));
        let position = removed.position.min(self.entries.len());
        self.entries.insert(position, removed.entry);
        self.reindex();
        self.revision += 1;
        true
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn is_visible(&self, record: &R) -> bool {
        self.visible.map_or(true, |visible| visible(record))
    }

    /// Drop hidden records and collapse duplicate keys: the first position
    /// wins, the last body wins.
    fn dedupe(&self, records: Vec<R>) -> Vec<R> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut out: Vec<R> = Vec::with_capacity(records.len());
        for record in records {
            if !self.is_visible(&record) {
                continue;
            }
            match positions.get(record.id()) {
                Some(&pos) => out[pos] = record,
                None => {
                    positions.insert(record.id().to_string(), out.len());
                    out.push(record);
                }
            }
        }
        out
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.record.id().to_string(), pos))
            .collect();
        debug_assert_eq!(self.index.len(), self.entries.len());
    }

    /// Keys currently held.
    pub fn keys(&self) -> HashSet<String> {
        self.index.keys().cloned().collect()
    }
}

fn is_older<R: Record>(incoming: &R, held: &R) -> bool {
    matches!((incoming.version(), held.version()), (Some(new), Some(old)) if new < old)
}
