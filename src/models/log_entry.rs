use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::EventNames;
use crate::source::{Endpoint, Method, Route};
use crate::store::OrderPolicy;
use crate::Record;

/// Visit state of a library log entry. Anything the backend sends besides
/// the two check states is shown as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogStatus {
    CheckedIn,
    CheckedOut,
    #[default]
    Pending,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::CheckedIn => "Checked In",
            LogStatus::CheckedOut => "Checked Out",
            LogStatus::Pending => "Pending",
        }
    }
}

impl From<String> for LogStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Checked In" => LogStatus::CheckedIn,
            "Checked Out" => LogStatus::CheckedOut,
            _ => LogStatus::Pending,
        }
    }
}

impl From<LogStatus> for String {
    fn from(status: LogStatus) -> String {
        status.as_str().to_string()
    }
}

/// The student fields embedded in a log entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrintRecord {
    pub quantity: u32,
    pub date: DateTime<Utc>,
}

/// One library visit: time in, optional time out, and print usage.
///
/// The log channel pushes `{ "type": "timein" | "timeout" | "print", "log": … }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "logs", envelope = "log")]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(rename = "_id")]
    #[record(id)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentSummary>,
    /// Not every row carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_in: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: LogStatus,
    #[serde(default)]
    pub print_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_printed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub print_history: Vec<PrintRecord>,
    #[serde(default)]
    pub already_printed: bool,
}

/// Print quantity typed next to a visit before timing it out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogLocal {
    pub print_quantity: u32,
}

impl LogEntry {
    pub fn endpoint() -> Endpoint {
        Endpoint {
            list: Route::new(Method::Get, "/api/logs"),
            list_key: Some("data"),
            item_key: Some("log"),
            create: Some(Route::new(Method::Post, "/api/logs/timein")),
            update: Some(Route::new(Method::Post, "/api/logs/timeout").with_id_field("logId")),
            delete: None,
        }
    }

    /// The backend announces time-ins, time-outs and prints as updates only.
    pub fn events() -> EventNames {
        EventNames::updates_only("logUpdated")
    }

    /// Open visits first, then most recent time-in first. Visits without a
    /// time-in sort last within their group.
    pub fn order_policy() -> OrderPolicy<LogEntry> {
        OrderPolicy::ActiveFirst {
            closed_at: |log| log.time_out,
            sort_key: |log| log.time_in,
        }
    }

    pub fn student_code(&self) -> &str {
        self.student
            .as_ref()
            .map(|s| s.student_id.as_str())
            .unwrap_or("N/A")
    }

    pub fn student_name(&self) -> String {
        match &self.student {
            Some(s) => format!("{} {}", s.first_name, s.last_name),
            None => "Unknown Student".to_string(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.time_out.is_none()
    }
}
