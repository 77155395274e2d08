//! Push event channel - server-initiated record notifications.
//!
//! Payloads travel as JSON text. A live collection subscribes to the
//! created/updated event names of its kind and decodes each payload with
//! [`Record::from_push`](crate::Record::from_push).

#[cfg(feature = "emitter")]
mod emitter;

use std::fmt;
use std::thread::JoinHandle;

#[cfg(feature = "emitter")]
pub use emitter::EmitterChannel;

/// Callback invoked with each payload of a subscribed event.
pub type Listener = Box<dyn Fn(String) + Send + Sync + 'static>;

/// Handle returned by [`PushChannel::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-flight deliveries of one emitted event.
#[derive(Default)]
pub struct Delivery(Vec<JoinHandle<()>>);

impl Delivery {
    pub fn new(handles: Vec<JoinHandle<()>>) -> Self {
        Delivery(handles)
    }

    /// Nothing was delivered (no subscribers, or disconnected).
    pub fn none() -> Self {
        Delivery(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every listener has returned.
    pub fn is_finished(&self) -> bool {
        self.0.iter().all(JoinHandle::is_finished)
    }

    /// Block until every listener has returned.
    pub fn wait(self) {
        for handle in self.0 {
            // A panicking listener must not take the emitter down with it.
            let _ = handle.join();
        }
    }
}

/// A named-event channel shared by every live collection of a session.
pub trait PushChannel: Send + Sync {
    fn subscribe(&self, event: &str, listener: Listener) -> SubscriptionId;

    /// Returns false when the subscription was not registered.
    fn unsubscribe(&self, id: &SubscriptionId) -> bool;

    fn emit(&self, event: &str, payload: String) -> Delivery;

    /// Ask the server to add this connection to a room, e.g. `joinAdmin`.
    /// Joins are remembered and re-sent after a reconnect.
    fn join_room(&self, signal: &str);
}

/// The event names a collection listens on. Kinds without a creation
/// event (logs) only carry `updated`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventNames {
    pub created: Option<String>,
    pub updated: Option<String>,
}

impl EventNames {
    pub fn new(created: impl Into<String>, updated: impl Into<String>) -> Self {
        EventNames {
            created: Some(created.into()),
            updated: Some(updated.into()),
        }
    }

    pub fn updates_only(updated: impl Into<String>) -> Self {
        EventNames {
            created: None,
            updated: Some(updated.into()),
        }
    }

    /// `<singular>Created` / `<singular>Updated` for a collection name
    /// such as `books`.
    pub fn for_collection(collection: &str) -> Self {
        let singular = collection.strip_suffix('s').unwrap_or(collection);
        EventNames::new(format!("{}Created", singular), format!("{}Updated", singular))
    }
}
