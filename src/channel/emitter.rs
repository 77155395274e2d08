//! EmitterChannel - a process-local push channel on `event_emitter_rs`.
//!
//! Stands in for the socket connection: listeners run on emitter threads,
//! events emitted while disconnected are dropped, and room joins are
//! replayed on every (re)connect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use event_emitter_rs::EventEmitter;

use super::{Delivery, Listener, PushChannel, SubscriptionId};

/// In-process [`PushChannel`].
///
/// Every listener of every emit runs on its own thread, so two events
/// emitted back to back can reach a subscriber in either order, even for
/// the same key. There is no per-connection ordering as a socket has.
/// Join the returned [`Delivery`] before emitting the next event when
/// order matters.
#[derive(Clone)]
pub struct EmitterChannel {
    emitter: Arc<Mutex<EventEmitter>>,
    connected: Arc<AtomicBool>,
    rooms: Arc<Mutex<Vec<String>>>,
    joins: Arc<Mutex<HashMap<String, usize>>>,
    sent_joins: Arc<AtomicUsize>,
}

impl Default for EmitterChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitterChannel {
    /// A connected channel.
    pub fn new() -> Self {
        EmitterChannel {
            emitter: Arc::new(Mutex::new(EventEmitter::new())),
            connected: Arc::new(AtomicBool::new(true)),
            rooms: Arc::new(Mutex::new(Vec::new())),
            joins: Arc::new(Mutex::new(HashMap::new())),
            sent_joins: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::info!("push channel disconnected");
        }
    }

    /// Reconnect and re-send every room join.
    pub fn connect(&self) {
        if self.connected.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("push channel connected");
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner()).clone();
        for room in rooms {
            self.send_join(&room);
        }
    }

    /// How many times `signal` has been sent to the server.
    pub fn join_count(&self, signal: &str) -> usize {
        self.joins
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(signal)
            .copied()
            .unwrap_or(0)
    }

    /// Total joins sent across all rooms.
    pub fn joins_sent(&self) -> usize {
        self.sent_joins.load(Ordering::SeqCst)
    }

    fn send_join(&self, signal: &str) {
        *self
            .joins
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(signal.to_string())
            .or_insert(0) += 1;
        self.sent_joins.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(room = signal, "joined room");
    }
}

impl PushChannel for EmitterChannel {
    fn subscribe(&self, event: &str, listener: Listener) -> SubscriptionId {
        let mut emitter = self.emitter.lock().unwrap_or_else(|e| e.into_inner());
        let id = emitter.on(event, move |payload: String| listener(payload));
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let mut emitter = self.emitter.lock().unwrap_or_else(|e| e.into_inner());
        emitter.remove_listener(&id.0).is_some()
    }

    fn emit(&self, event: &str, payload: String) -> Delivery {
        if !self.is_connected() {
            tracing::debug!(event, "dropped event while disconnected");
            return Delivery::none();
        }
        let mut emitter = self.emitter.lock().unwrap_or_else(|e| e.into_inner());
        Delivery::new(emitter.emit(event, payload))
    }

    fn join_room(&self, signal: &str) {
        {
            let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
            if !rooms.iter().any(|r| r == signal) {
                rooms.push(signal.to_string());
            }
        }
        if self.is_connected() {
            self.send_join(signal);
        }
    }
}
