//! Live-synchronized collections for a library admin client.
//!
//! Each record kind (reservations, students, books, logs, announcements) is
//! held in a [`ReconcilingStore`] that merges full snapshots, periodic
//! refetches and `created`/`updated` push events into one de-duplicated,
//! ordered collection. A [`LiveCollection`] wires a store to a
//! [`CollectionSource`] and a [`PushChannel`], routes every write through
//! the store (optimistic apply, rollback on failure) and discards results
//! that arrive after it was closed. The [`aggregate`] module derives the
//! dashboard counts from the held collections.

extern crate self as shelf_sync;

pub mod aggregate;
pub mod channel;
pub mod config;
pub mod error;
pub mod live;
pub mod logging;
pub mod models;
pub mod record;
pub mod source;
pub mod store;
pub mod views;

pub use aggregate::{Dashboard, DashboardStats, Lifecycle, MonthlyStat, StatusRules};
#[cfg(feature = "emitter")]
pub use channel::EmitterChannel;
pub use channel::{Delivery, EventNames, PushChannel, SubscriptionId};
pub use config::{ConfigError, SyncConfig};
pub use error::SyncError;
pub use live::{LiveCollection, RefreshStats, RefreshThread};
pub use record::{Populated, Record, Retain};
pub use source::{CollectionSource, Endpoint, InMemorySource, SourceError};
#[cfg(feature = "http")]
pub use source::HttpSource;
pub use store::{Applied, Entry, InsertAt, OrderPolicy, ReconcilingStore, SnapshotSummary};

// Derive macro for `Record`
pub use shelf_sync_macros::Record;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
