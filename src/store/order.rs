use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};

use super::Entry;

type Timestamp<R> = fn(&R) -> Option<DateTime<Utc>>;

/// How `snapshot()` orders the collection.
pub enum OrderPolicy<R> {
    /// Keep the held order: snapshot order, with pushed records prepended.
    ServerOrder,
    /// Records without a terminal timestamp first, then `sort_key` descending.
    ActiveFirst {
        closed_at: Timestamp<R>,
        sort_key: Timestamp<R>,
    },
}

impl<R> OrderPolicy<R> {
    pub fn arrange<L>(&self, entries: &mut [Entry<R, L>]) {
        match self {
            OrderPolicy::ServerOrder => {}
            OrderPolicy::ActiveFirst {
                closed_at,
                sort_key,
            } => entries.sort_by(|a, b| {
                let a_open = closed_at(&a.record).is_none();
                let b_open = closed_at(&b.record).is_none();
                b_open
                    .cmp(&a_open)
                    .then_with(|| newest_first(sort_key(&a.record), sort_key(&b.record)))
            }),
        }
    }
}

fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl<R> Clone for OrderPolicy<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for OrderPolicy<R> {}

impl<R> Default for OrderPolicy<R> {
    fn default() -> Self {
        OrderPolicy::ServerOrder
    }
}

impl<R> fmt::Debug for OrderPolicy<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderPolicy::ServerOrder => write!(f, "ServerOrder"),
            OrderPolicy::ActiveFirst { .. } => write!(f, "ActiveFirst"),
        }
    }
}
