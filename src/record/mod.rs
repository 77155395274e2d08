//! Records - immutable server snapshots keyed by an immutable id.
//!
//! A record is never mutated in place by the store: a newer snapshot bearing
//! the same key replaces it wholesale. Two hooks customise that replacement:
//!
//! - [`Record::retain_from`] carries nested fields forward when an update
//!   arrives with a partial or denormalized payload.
//! - [`Record::version`] lets the store reject a snapshot older than the one
//!   it already holds.
//!
//! ## Example
//!
//! ```ignore
//! use shelf_sync::{Populated, Record};
//!
//! #[derive(Clone, Serialize, Deserialize, Record)]
//! #[record(collection = "reservations")]
//! struct Reservation {
//!     #[serde(rename = "_id")]
//!     #[record(id)]
//!     pub id: String,
//!     #[record(retain)]
//!     pub book: Option<Populated<Book>>,
//!     pub status: String,
//! }
//! ```

mod populated;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub use populated::Populated;

/// A domain entity fetched from a server collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name, used for logging and as the default event prefix.
    const COLLECTION: &'static str;

    /// The immutable unique key.
    fn id(&self) -> &str;

    /// Monotonic version of this snapshot, if the server provides one.
    fn version(&self) -> Option<u64> {
        None
    }

    /// Called on the incoming snapshot before it replaces `prior`.
    fn retain_from(&mut self, _prior: &Self) {}

    /// Decode a push-channel payload into a record.
    fn from_push(payload: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload)
    }
}

/// Field-level merge rule applied by [`Record::retain_from`].
pub trait Retain {
    fn retain_from(&mut self, prior: &Self);
}

impl<T: Retain + Clone> Retain for Option<T> {
    fn retain_from(&mut self, prior: &Self) {
        match (self.as_mut(), prior) {
            (None, Some(prior)) => *self = Some(prior.clone()),
            (Some(incoming), Some(prior)) => incoming.retain_from(prior),
            _ => {}
        }
    }
}

// Scalars have no nested structure: an incoming value always wins.
macro_rules! leaf_retain {
    ($($ty:ty),+ $(,)?) => {
        $(impl Retain for $ty {
            fn retain_from(&mut self, _prior: &Self) {}
        })+
    };
}

leaf_retain!(String, bool, u32, u64, i64, f64, DateTime<Utc>);

/// Decode a payload that may wrap the record under `key`.
///
/// Payloads without the key are decoded as the record itself.
pub fn decode_enveloped<R: DeserializeOwned>(
    mut payload: Value,
    key: &str,
) -> Result<R, serde_json::Error> {
    let inner = payload.as_object_mut().and_then(|obj| obj.remove(key));
    match inner {
        Some(inner) => serde_json::from_value(inner),
        None => serde_json::from_value(payload),
    }
}
