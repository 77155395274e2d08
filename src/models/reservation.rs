use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Book, Student};
use crate::aggregate::Lifecycle;
use crate::channel::EventNames;
use crate::record::Populated;
use crate::source::{Endpoint, Method, Route};
use crate::Record;

wire_status! {
    /// Reservation lifecycle as reported by the backend.
    ReservationStatus {
        Reserved => "reserved",
        Approved => "approved",
        Borrowed => "borrowed",
        Declined => "declined",
        Returned => "returned",
        Expired => "expired",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

/// A book reservation. Student and book references arrive populated or as
/// bare ids; updates that omit them keep the held values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "reservations")]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(rename = "_id")]
    #[record(id)]
    pub id: String,
    #[serde(rename = "studentId", default, skip_serializing_if = "Option::is_none")]
    #[record(retain)]
    pub student: Option<Populated<Student>>,
    #[serde(rename = "bookId", default, skip_serializing_if = "Option::is_none")]
    #[record(retain)]
    pub book: Option<Populated<Book>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[record(retain)]
    pub reserved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub status: ReservationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[record(version)]
    pub revision: Option<u64>,
}

/// Per-reservation input held while an admin picks a due date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReservationLocal {
    pub pending_due_date: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn new(id: impl Into<String>, status: impl Into<ReservationStatus>) -> Self {
        Reservation {
            id: id.into(),
            student: None,
            book: None,
            reserved_at: None,
            due_date: None,
            status: status.into(),
            revision: None,
        }
    }

    pub fn endpoint() -> Endpoint {
        Endpoint {
            list: Route::new(Method::Get, "/api/reservation/admin/all"),
            list_key: Some("reservations"),
            item_key: Some("reservation"),
            create: None,
            update: Some(Route::new(Method::Patch, "/api/reservation/{id}/status")),
            delete: None,
        }
    }

    pub fn events() -> EventNames {
        EventNames::new("reservationCreated", "reservationUpdated")
    }

    /// Cancelled reservations are not shown to admins.
    pub fn is_listed(&self) -> bool {
        self.status != ReservationStatus::Cancelled
    }

    pub fn student_code(&self) -> &str {
        match &self.student {
            Some(Populated::Object(student)) if !student.student_id.is_empty() => {
                &student.student_id
            }
            Some(Populated::Object(_)) | None => "-",
            Some(Populated::Id(id)) => id,
        }
    }

    pub fn student_name(&self) -> String {
        self.student
            .as_ref()
            .and_then(Populated::object)
            .map(Student::full_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn book_title(&self) -> &str {
        match &self.book {
            Some(Populated::Object(book)) => &book.title,
            Some(Populated::Id(id)) => id,
            None => "Unknown Book",
        }
    }
}

impl Lifecycle for Reservation {
    fn status(&self) -> &str {
        self.status.as_str()
    }

    fn primary_date(&self) -> Option<DateTime<Utc>> {
        self.reserved_at
    }

    fn fallback_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }
}
