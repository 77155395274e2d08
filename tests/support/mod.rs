//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shelf_sync::models::{Book, LogEntry, LogLocal, Reservation, ReservationLocal, Student};
use shelf_sync::{
    CollectionSource, EmitterChannel, InMemorySource, LiveCollection, Populated, PushChannel,
    ReconcilingStore, Record, SourceError,
};

pub const ADMIN_ROOM: &str = "joinAdmin";

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn student(id: &str, code: &str, first: &str, last: &str) -> Student {
    Student {
        id: id.into(),
        student_id: code.into(),
        first_name: first.into(),
        last_name: last.into(),
        ..Student::default()
    }
}

pub fn book(id: &str, title: &str) -> Book {
    Book {
        id: id.into(),
        title: title.into(),
        ..Book::default()
    }
}

pub fn reservation(id: &str, status: &str) -> Reservation {
    Reservation::new(id, status)
}

pub fn populated_reservation(id: &str, status: &str, who: Student, what: Book) -> Reservation {
    let mut r = Reservation::new(id, status);
    r.student = Some(Populated::Object(who));
    r.book = Some(Populated::Object(what));
    r
}

/// Emit `record` as JSON on `event` and wait for every listener.
pub fn push<T: Serialize>(channel: &EmitterChannel, event: &str, record: &T) {
    let payload = serde_json::to_string(record).unwrap();
    channel.emit(event, payload).wait();
}

pub fn push_raw(channel: &EmitterChannel, event: &str, payload: Value) {
    channel.emit(event, payload.to_string()).wait();
}

pub fn ids<R: Record>(records: &[R]) -> Vec<String> {
    records.iter().map(|r| r.id().to_string()).collect()
}

/// A reservations page wired to an in-memory backend that broadcasts its
/// writes on the channel, the way the real server does.
pub struct ReservationsPage {
    pub channel: Arc<EmitterChannel>,
    pub source: InMemorySource<Reservation>,
    pub live: LiveCollection<Reservation, ReservationLocal>,
}

impl ReservationsPage {
    pub fn open(records: Vec<Reservation>) -> Self {
        let channel = Arc::new(EmitterChannel::new());
        let source = InMemorySource::with_records(records)
            .with_broadcast(channel.clone(), Reservation::events());
        let live = LiveCollection::new(
            Arc::new(source.clone()),
            ReconcilingStore::new().with_filter(Reservation::is_listed),
        );
        channel.join_room(ADMIN_ROOM);
        live.initialize().unwrap();
        live.attach(channel.clone(), &Reservation::events());
        ReservationsPage {
            channel,
            source,
            live,
        }
    }

    pub fn records(&self) -> Vec<Reservation> {
        self.live.records().unwrap()
    }

    pub fn held(&self, id: &str) -> Reservation {
        self.live.get(id).unwrap().unwrap().record
    }
}

/// A logs page. Time-ins are created by the backend from the student code.
pub struct LogsPage {
    pub channel: Arc<EmitterChannel>,
    pub source: InMemorySource<LogEntry>,
    pub live: LiveCollection<LogEntry, LogLocal>,
}

impl LogsPage {
    pub fn open(records: Vec<LogEntry>, now: DateTime<Utc>) -> Self {
        let channel = Arc::new(EmitterChannel::new());
        let source = InMemorySource::with_records(records)
            .on_create(move |body| {
                let code = body["studentId"].as_str().unwrap_or_default();
                Ok(open_log(&format!("log-{}", code), code, now))
            })
            .on_update(move |held, body| {
                let mut closed = held.clone();
                closed.time_out = Some(now);
                closed.status = shelf_sync::models::LogStatus::CheckedOut;
                if let Some(count) = body.get("printCount").and_then(Value::as_u64) {
                    closed.print_count += count as u32;
                    closed.already_printed = true;
                }
                Ok(closed)
            })
            .with_broadcast(channel.clone(), LogEntry::events());
        let live = LiveCollection::new(
            Arc::new(source.clone()),
            ReconcilingStore::new().with_order(LogEntry::order_policy()),
        );
        live.initialize().unwrap();
        live.attach(channel.clone(), &LogEntry::events());
        LogsPage {
            channel,
            source,
            live,
        }
    }
}

pub fn open_log(id: &str, code: &str, time_in: DateTime<Utc>) -> LogEntry {
    serde_json::from_value(serde_json::json!({
        "_id": id,
        "student": { "studentId": code, "firstName": "Test", "lastName": code },
        "timeIn": time_in,
        "status": "Checked In",
    }))
    .unwrap()
}

/// Wraps an in-memory source so one armed fetch blocks until released,
/// to interleave push events with an in-flight refresh.
pub struct GatedSource<R: Record> {
    pub inner: InMemorySource<R>,
    armed: AtomicBool,
    echo: AtomicBool,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

pub struct Gate {
    pub entered: Receiver<()>,
    pub release: Sender<()>,
}

impl<R: Record> GatedSource<R> {
    pub fn new(inner: InMemorySource<R>) -> (Arc<Self>, Gate) {
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        let source = Arc::new(GatedSource {
            inner,
            armed: AtomicBool::new(false),
            echo: AtomicBool::new(true),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        (
            source,
            Gate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }

    /// Accept updates without returning the updated record, like a
    /// backend that answers `{ success: true }` only.
    pub fn without_echo(&self) {
        self.echo.store(false, Ordering::SeqCst);
    }

    /// Block the next fetch until the gate is released.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl<R: Record> CollectionSource<R> for GatedSource<R> {
    fn fetch_all(&self) -> Result<Vec<R>, SourceError> {
        // Read the collection before blocking: the fetch "left" the server
        // before anything pushed during the wait.
        let records = self.inner.fetch_all();
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        records
    }

    fn create(&self, body: &Value) -> Result<Option<R>, SourceError> {
        self.inner.create(body)
    }

    fn update(&self, id: &str, patch: &Value) -> Result<Option<R>, SourceError> {
        let echo = self.inner.update(id, patch)?;
        Ok(echo.filter(|_| self.echo.load(Ordering::SeqCst)))
    }

    fn delete(&self, id: &str) -> Result<(), SourceError> {
        self.inner.delete(id)
    }
}
