use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::{Endpoint, Method, Route};
use crate::Record;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "announcements")]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(rename = "_id")]
    #[record(id)]
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Announcement {
    pub fn endpoint() -> Endpoint {
        Endpoint {
            list: Route::new(Method::Get, "/api/announcements"),
            list_key: None,
            item_key: Some("announcement"),
            create: Some(Route::new(Method::Post, "/api/announcements")),
            update: Some(Route::new(Method::Put, "/api/announcements/{id}")),
            delete: Some(Route::new(Method::Delete, "/api/announcements/{id}")),
        }
    }
}
