//! InMemorySource - vector-backed collection source for tests and offline use.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

use super::{CollectionSource, SourceError};
use crate::channel::{Delivery, EventNames, PushChannel};
use crate::record::Record;

type CreateFn<R> = Arc<dyn Fn(&Value) -> Result<R, SourceError> + Send + Sync>;
type UpdateFn<R> = Arc<dyn Fn(&R, &Value) -> Result<R, SourceError> + Send + Sync>;

/// A request received by an [`InMemorySource`].
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCall {
    pub operation: &'static str,
    pub id: Option<String>,
    pub body: Option<Value>,
}

/// In-memory collection source.
///
/// Features:
/// - Clone-friendly via Arc; clones share the collection
/// - Queued failure injection with [`fail_next`](Self::fail_next)
/// - Records every request for assertions
/// - Optionally broadcasts created/updated events to a push channel after
///   each successful write, the way the backend does
#[derive(Clone)]
pub struct InMemorySource<R> {
    records: Arc<RwLock<Vec<R>>>,
    failures: Arc<Mutex<VecDeque<SourceError>>>,
    calls: Arc<Mutex<Vec<SourceCall>>>,
    on_create: Option<CreateFn<R>>,
    on_update: Option<UpdateFn<R>>,
    broadcast: Option<(Arc<dyn PushChannel>, EventNames)>,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl<R: Record> Default for InMemorySource<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> InMemorySource<R> {
    pub fn new() -> Self {
        InMemorySource {
            records: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            on_create: None,
            on_update: None,
            broadcast: None,
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_records(records: Vec<R>) -> Self {
        let source = Self::new();
        source.set_records(records);
        source
    }

    /// Build created records from request bodies with `factory` instead of
    /// decoding the body as the record.
    pub fn on_create<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<R, SourceError> + Send + Sync + 'static,
    {
        self.on_create = Some(Arc::new(factory));
        self
    }

    /// Compute updated records with `apply` instead of merging the patch's
    /// top-level fields.
    pub fn on_update<F>(mut self, apply: F) -> Self
    where
        F: Fn(&R, &Value) -> Result<R, SourceError> + Send + Sync + 'static,
    {
        self.on_update = Some(Arc::new(apply));
        self
    }

    /// Emit `names` events on `channel` after successful writes.
    pub fn with_broadcast(mut self, channel: Arc<dyn PushChannel>, names: EventNames) -> Self {
        self.broadcast = Some((channel, names));
        self
    }

    /// Replace the server-side collection (e.g. to simulate a delete made
    /// by another client).
    pub fn set_records(&self, records: Vec<R>) {
        *self.records.write().unwrap_or_else(|e| e.into_inner()) = records;
    }

    pub fn records(&self) -> Vec<R> {
        self.records.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The next request fails with `err`.
    pub fn fail_next(&self, err: SourceError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Wait until every broadcast so far has reached its subscribers.
    pub fn wait_broadcasts(&self) {
        let pending: Vec<Delivery> = self
            .deliveries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for delivery in pending {
            delivery.wait();
        }
    }

    /// Deliveries held for [`wait_broadcasts`](Self::wait_broadcasts).
    pub fn pending_broadcasts(&self) -> usize {
        self.deliveries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Every held delivery has reached its subscribers.
    pub fn broadcasts_finished(&self) -> bool {
        self.deliveries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .all(Delivery::is_finished)
    }

    fn begin(
        &self,
        operation: &'static str,
        id: Option<&str>,
        body: Option<&Value>,
    ) -> Result<(), SourceError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SourceCall {
                operation,
                id: id.map(str::to_string),
                body: body.cloned(),
            });
        match self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn announce(&self, created: bool, record: &R) -> Result<(), SourceError> {
        let Some((channel, names)) = &self.broadcast else {
            return Ok(());
        };
        let event = if created {
            names.created.as_ref().or(names.updated.as_ref())
        } else {
            names.updated.as_ref()
        };
        if let Some(event) = event {
            let payload = serde_json::to_string(record)?;
            let delivery = channel.emit(event, payload);
            let mut deliveries = self.deliveries.lock().unwrap_or_else(|e| e.into_inner());
            deliveries.retain(|held| !held.is_finished());
            deliveries.push(delivery);
        }
        Ok(())
    }
}

fn merge_patch<R: Record>(record: &R, patch: &Value) -> Result<R, SourceError> {
    let mut value = serde_json::to_value(record)?;
    if let (Value::Object(target), Value::Object(fields)) = (&mut value, patch) {
        for (key, field) in fields {
            target.insert(key.clone(), field.clone());
        }
    }
    Ok(serde_json::from_value(value)?)
}

impl<R: Record> CollectionSource<R> for InMemorySource<R> {
    fn fetch_all(&self) -> Result<Vec<R>, SourceError> {
        self.begin("fetch_all", None, None)?;
        Ok(self.records())
    }

    fn create(&self, body: &Value) -> Result<Option<R>, SourceError> {
        self.begin("create", None, Some(body))?;
        let record = match &self.on_create {
            Some(factory) => factory(body)?,
            None => serde_json::from_value(body.clone())?,
        };
        {
            let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
            records.retain(|r| r.id() != record.id());
            records.insert(0, record.clone());
        }
        self.announce(true, &record)?;
        Ok(Some(record))
    }

    fn update(&self, id: &str, patch: &Value) -> Result<Option<R>, SourceError> {
        self.begin("update", Some(id), Some(patch))?;
        let updated = {
            let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
            let held = records
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| SourceError::NotFound(id.to_string()))?;
            let updated = match &self.on_update {
                Some(apply) => apply(held, patch)?,
                None => merge_patch(held, patch)?,
            };
            *held = updated.clone();
            updated
        };
        self.announce(false, &updated)?;
        Ok(Some(updated))
    }

    fn delete(&self, id: &str) -> Result<(), SourceError> {
        self.begin("delete", Some(id), None)?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Err(SourceError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
