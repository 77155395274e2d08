use serde::{Deserialize, Serialize};

use super::contains_ci;
use crate::source::{Endpoint, Method, Route};
use crate::Record;

/// A catalogue entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "books")]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    #[record(id)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub category: Vec<String>,
    /// Cover image URL returned by the upload host. Not validated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrowed_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lost_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Book {
    pub fn endpoint() -> Endpoint {
        Endpoint {
            list: Route::new(Method::Get, "/api/books"),
            list_key: None,
            item_key: Some("book"),
            create: Some(Route::new(Method::Post, "/api/books")),
            update: Some(Route::new(Method::Put, "/api/books/{id}")),
            delete: Some(Route::new(Method::Delete, "/api/books/{id}")),
        }
    }

    /// Push events that invalidate the catalogue counts; the backend sends
    /// no record payload with them, so they trigger a refetch.
    pub const REFRESH_EVENTS: &'static [&'static str] = &["bookStatusUpdated", "bookReturned"];

    /// Matches the catalogue search box: title, author or any category.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || contains_ci(&self.title, &query)
            || contains_ci(&self.author, &query)
            || contains_ci(&self.category.join(", "), &query)
    }
}
