use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contains_ci;
use crate::source::{Endpoint, Method, Route};
use crate::Record;

wire_status! {
    /// Account state of a student. New sign-ups wait in `Pending` until an
    /// admin verifies them.
    StudentStatus {
        Pending => "Pending",
        Active => "Active",
        Inactive => "Inactive",
        Blocked => "Blocked",
    }
}

/// A registered student account.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "students")]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    #[record(id)]
    pub id: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schoolname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardianname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    /// Uploaded ID images (opaque URLs from the media host).
    #[serde(rename = "validIDs", default)]
    pub valid_ids: Vec<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StudentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_reservations: Option<u32>,
}

impl Student {
    pub fn endpoint() -> Endpoint {
        Endpoint {
            list: Route::new(Method::Get, "/api/students"),
            list_key: Some("data"),
            item_key: Some("data"),
            create: None,
            update: Some(Route::new(Method::Patch, "/api/students/{id}")),
            delete: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Matches the accounts search box: full name or student code.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || contains_ci(&format!("{} {}", self.first_name, self.last_name), &query)
            || contains_ci(&self.student_id, &query)
    }
}
