use serde::{Deserialize, Serialize};

use super::{Record, Retain};

/// An embedded reference the server sends either populated or as a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Populated<T> {
    Object(T),
    Id(String),
}

impl<T: Record> Populated<T> {
    /// The referenced key, whichever form was sent.
    pub fn key(&self) -> &str {
        match self {
            Populated::Object(inner) => inner.id(),
            Populated::Id(id) => id,
        }
    }

    pub fn object(&self) -> Option<&T> {
        match self {
            Populated::Object(inner) => Some(inner),
            Populated::Id(_) => None,
        }
    }
}

impl<T: Record> Retain for Populated<T> {
    fn retain_from(&mut self, prior: &Self) {
        // A bare id never downgrades a populated object for the same key.
        if let (Populated::Id(id), Populated::Object(held)) = (&*self, prior) {
            if held.id() == id {
                *self = prior.clone();
            }
        }
    }
}
