//! LiveCollection - one record kind kept live from fetches, polling and
//! push events, with every write routed through the store.
//!
//! All mutations of the store happen under one mutex, so snapshots, push
//! events and writes are applied in the order they reach the lock. Fetches
//! run outside the lock: push events that land mid-fetch are journaled by
//! the store and replayed on top of the snapshot.
//!
//! ## Example
//!
//! ```ignore
//! use shelf_sync::{EmitterChannel, LiveCollection, InMemorySource};
//! use shelf_sync::models::{Reservation, ReservationLocal};
//!
//! let channel = Arc::new(EmitterChannel::new());
//! let live: LiveCollection<Reservation, ReservationLocal> =
//!     LiveCollection::new(Arc::new(source), store);
//! live.initialize()?;
//! live.attach(channel.clone(), &Reservation::events());
//!
//! live.set_pending_due_date("r-1", due)?;
//! live.approve_reservation("r-1")?;
//! ```

mod commands;
mod refresh_thread;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::channel::{EventNames, PushChannel, SubscriptionId};
use crate::error::SyncError;
use crate::record::Record;
use crate::source::{CollectionSource, SourceError};
use crate::store::{Applied, Entry, ReconcilingStore, RefreshTicket, SnapshotSummary};

pub use refresh_thread::{RefreshStats, RefreshThread, DEFAULT_POLL_INTERVAL};

struct Shared<R: Record, L> {
    store: Mutex<ReconcilingStore<R, L>>,
    source: Arc<dyn CollectionSource<R>>,
    alive: AtomicBool,
    subscriptions: Mutex<Vec<(Arc<dyn PushChannel>, SubscriptionId)>>,
}

impl<R: Record, L> Shared<R, L> {
    fn unsubscribe_all(&self) {
        let subscriptions: Vec<_> = self
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for (channel, id) in subscriptions {
            channel.unsubscribe(&id);
        }
    }
}

impl<R: Record, L> Drop for Shared<R, L> {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

/// A live, shared view of one server collection. Clones share state.
pub struct LiveCollection<R: Record, L = ()> {
    shared: Arc<Shared<R, L>>,
}

impl<R: Record, L> Clone for LiveCollection<R, L> {
    fn clone(&self) -> Self {
        LiveCollection {
            shared: Arc::clone(&self.shared),
        }
    }
}

#[derive(Clone, Copy)]
enum PushKind {
    Created,
    Updated,
}

impl<R, L> LiveCollection<R, L>
where
    R: Record,
    L: Default + Clone + Send + 'static,
{
    pub fn new(source: Arc<dyn CollectionSource<R>>, store: ReconcilingStore<R, L>) -> Self {
        LiveCollection {
            shared: Arc::new(Shared {
                store: Mutex::new(store),
                source,
                alive: AtomicBool::new(true),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The ordered collection with local state.
    pub fn snapshot(&self) -> Result<Vec<Entry<R, L>>, SyncError> {
        Ok(self.lock("snapshot")?.snapshot())
    }

    pub fn records(&self) -> Result<Vec<R>, SyncError> {
        Ok(self.lock("records")?.records())
    }

    pub fn get(&self, id: &str) -> Result<Option<Entry<R, L>>, SyncError> {
        Ok(self.lock("get")?.get(id).cloned())
    }

    /// Run `f` against the store under the lock.
    pub fn read<T>(&self, f: impl FnOnce(&ReconcilingStore<R, L>) -> T) -> Result<T, SyncError> {
        let store = self.lock("read")?;
        Ok(f(&store))
    }

    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    /// Fetch the full collection and replace the held one, clearing all
    /// local state.
    pub fn initialize(&self) -> Result<(), SyncError> {
        let ticket = self.lock("initialize")?.begin_refresh();
        match self.shared.source.fetch_all() {
            Ok(records) => {
                if !self.is_alive() {
                    debug!(collection = R::COLLECTION, "fetch finished after close");
                    return Ok(());
                }
                self.lock("initialize")?.complete_reset(ticket, records);
                Ok(())
            }
            Err(err) => Err(self.fetch_failed(ticket, err)),
        }
    }

    /// Fetch the full collection and merge it, keeping local state for keys
    /// that are still present. Returns `None` when the result was discarded
    /// (closed, or superseded by a newer refresh).
    pub fn refresh(&self) -> Result<Option<SnapshotSummary>, SyncError> {
        let ticket = self.lock("refresh")?.begin_refresh();
        match self.shared.source.fetch_all() {
            Ok(records) => {
                if !self.is_alive() {
                    debug!(collection = R::COLLECTION, "fetch finished after close");
                    return Ok(None);
                }
                Ok(self.lock("refresh")?.complete_refresh(ticket, records))
            }
            Err(err) => Err(self.fetch_failed(ticket, err)),
        }
    }

    fn fetch_failed(&self, ticket: RefreshTicket, err: SourceError) -> SyncError {
        if let Ok(mut store) = self.lock("abandon_refresh") {
            store.abandon_refresh(ticket);
        }
        let err = SyncError::fetch(err);
        if err.is_recoverable() {
            warn!(collection = R::COLLECTION, error = %err, "fetch failed, keeping last snapshot");
        } else {
            error!(collection = R::COLLECTION, error = %err, "fetch unauthorized");
        }
        err
    }

    // ------------------------------------------------------------------
    // Push events
    // ------------------------------------------------------------------

    /// Subscribe to `names` on `channel`. Payloads are decoded with
    /// [`Record::from_push`]; undecodable payloads are logged and dropped.
    pub fn attach(&self, channel: Arc<dyn PushChannel>, names: &EventNames) {
        if let Some(event) = &names.created {
            self.subscribe(&channel, event, PushKind::Created);
        }
        if let Some(event) = &names.updated {
            self.subscribe(&channel, event, PushKind::Updated);
        }
    }

    /// Refetch whenever one of `events` arrives. For events that signal a
    /// change without carrying the record.
    pub fn refresh_on(&self, channel: Arc<dyn PushChannel>, events: &[&str]) {
        for event in events {
            let weak = Arc::downgrade(&self.shared);
            let name = event.to_string();
            let id = channel.subscribe(
                event,
                Box::new(move |_payload| {
                    let Some(live) = upgrade(&weak) else {
                        return;
                    };
                    debug!(collection = R::COLLECTION, event = %name, "refresh triggered");
                    // Failures are already logged; the next poll retries.
                    let _ = live.refresh();
                }),
            );
            self.track(channel.clone(), id);
        }
    }

    fn subscribe(&self, channel: &Arc<dyn PushChannel>, event: &str, kind: PushKind) {
        let weak = Arc::downgrade(&self.shared);
        let name = event.to_string();
        let id = channel.subscribe(
            event,
            Box::new(move |payload| {
                if let Some(live) = upgrade(&weak) {
                    live.on_push(&name, kind, &payload);
                }
            }),
        );
        self.track(channel.clone(), id);
    }

    fn track(&self, channel: Arc<dyn PushChannel>, id: SubscriptionId) {
        self.shared
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((channel, id));
    }

    fn on_push(&self, event: &str, kind: PushKind, payload: &str) {
        let record = match serde_json::from_str(payload).and_then(R::from_push) {
            Ok(record) => record,
            Err(err) => {
                warn!(collection = R::COLLECTION, event, error = %err, "undecodable push payload");
                return;
            }
        };
        let Ok(mut store) = self.lock("push") else {
            return;
        };
        let applied = match kind {
            PushKind::Created => store.apply_created(record),
            PushKind::Updated => store.apply_updated(record),
        };
        debug!(collection = R::COLLECTION, event, ?applied, "push applied");
    }

    /// Stop applying fetch results and push events, and drop all
    /// subscriptions. Idempotent.
    pub fn close(&self) {
        if self.shared.alive.swap(false, Ordering::SeqCst) {
            self.shared.unsubscribe_all();
            debug!(collection = R::COLLECTION, "closed");
        }
    }

    // ------------------------------------------------------------------
    // Local state
    // ------------------------------------------------------------------

    pub fn set_local(&self, id: &str, update: impl FnOnce(&mut L)) -> Result<bool, SyncError> {
        Ok(self.lock("set_local")?.set_local(id, update))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Create a record. Pessimistic: the store changes only once the
    /// server returns the created record.
    pub fn create(&self, body: &Value) -> Result<Option<R>, SyncError> {
        let created = self
            .shared
            .source
            .create(body)
            .map_err(|err| self.write_failed("create", None, err))?;
        if let Some(record) = &created {
            if self.is_alive() {
                self.lock("create")?.apply_created(record.clone());
            }
        }
        Ok(created)
    }

    /// Update a record optimistically: `preview` is applied to the held
    /// body before the request and rolled back if it fails. The server's
    /// echo, when present, is merged as an update.
    pub fn update(
        &self,
        id: &str,
        patch: &Value,
        preview: impl FnOnce(&mut R),
    ) -> Result<Option<R>, SyncError> {
        let (prior, optimistic) = {
            let mut store = self.lock("update")?;
            let prior = store
                .get(id)
                .map(|entry| entry.record.clone())
                .ok_or_else(|| self.unknown(id))?;
            let mut optimistic = prior.clone();
            preview(&mut optimistic);
            store.restore_record(optimistic.clone());
            (prior, optimistic)
        };

        match self.shared.source.update(id, patch) {
            Ok(echo) => {
                self.apply_echo(echo.clone())?;
                Ok(echo)
            }
            Err(err) => {
                let err = self.write_failed("update", Some(id), err);
                let mut store = self.lock("rollback")?;
                // Roll back only if nothing newer replaced the preview.
                let untouched = store
                    .get(id)
                    .is_some_and(|entry| same_body(&entry.record, &optimistic));
                if untouched {
                    store.restore_record(prior);
                }
                Err(err)
            }
        }
    }

    /// Update a record pessimistically.
    pub fn update_confirmed(&self, id: &str, patch: &Value) -> Result<Option<R>, SyncError> {
        if !self.lock("update")?.contains(id) {
            return Err(self.unknown(id));
        }
        let echo = self
            .shared
            .source
            .update(id, patch)
            .map_err(|err| self.write_failed("update", Some(id), err))?;
        self.apply_echo(echo.clone())?;
        Ok(echo)
    }

    /// Delete a record optimistically, restoring it at its old position if
    /// the request fails.
    pub fn delete(&self, id: &str) -> Result<(), SyncError> {
        let removed = self
            .lock("delete")?
            .remove(id)
            .ok_or_else(|| self.unknown(id))?;

        if let Err(err) = self.shared.source.delete(id) {
            let err = self.write_failed("delete", Some(id), err);
            self.lock("rollback")?.restore(removed);
            return Err(err);
        }
        Ok(())
    }

    fn apply_echo(&self, echo: Option<R>) -> Result<(), SyncError> {
        if let Some(record) = echo {
            if self.is_alive() {
                let applied = self.lock("update")?.apply_updated(record);
                if applied == Applied::Stale {
                    debug!(collection = R::COLLECTION, "write echo older than held record");
                }
            }
        }
        Ok(())
    }

    fn write_failed(&self, operation: &str, id: Option<&str>, err: SourceError) -> SyncError {
        let err = SyncError::write(err);
        if err.is_recoverable() {
            warn!(collection = R::COLLECTION, operation, id, error = %err, "write failed");
        } else {
            error!(collection = R::COLLECTION, operation, id, error = %err, "write unauthorized");
        }
        err
    }

    fn unknown(&self, id: &str) -> SyncError {
        SyncError::UnknownRecord {
            collection: R::COLLECTION.to_string(),
            id: id.to_string(),
        }
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, ReconcilingStore<R, L>>, SyncError> {
        self.shared
            .store
            .lock()
            .map_err(|_| SyncError::LockPoisoned(operation))
    }
}

fn upgrade<R: Record, L>(weak: &Weak<Shared<R, L>>) -> Option<LiveCollection<R, L>> {
    let shared = weak.upgrade()?;
    if !shared.alive.load(Ordering::SeqCst) {
        return None;
    }
    Some(LiveCollection { shared })
}

fn same_body<R: Serialize>(a: &R, b: &R) -> bool {
    match (serde_json::to_value(a), serde_json::to_value(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
