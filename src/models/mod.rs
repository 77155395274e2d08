//! Domain records of the library admin client.
//!
//! JSON follows the backend: `_id` keys and camelCase fields. Every model
//! carries its HTTP [`Endpoint`](crate::source::Endpoint) and, where the
//! backend pushes changes, its [`EventNames`](crate::channel::EventNames).

/// Declares a status enum carried on the wire as a case-sensitive string.
/// Unknown values are kept verbatim in `Other`.
macro_rules! wire_status {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            /// Wire names of the known statuses.
            pub const KNOWN: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Other(value) => value.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $($wire => $name::$variant,)+
                    _ => $name::Other(value),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name::from(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(status: $name) -> String {
                match status {
                    $name::Other(value) => value,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

mod announcement;
mod book;
mod log_entry;
mod reservation;
mod student;

pub use announcement::Announcement;
pub use book::Book;
pub use log_entry::{LogEntry, LogLocal, LogStatus, PrintRecord, StudentSummary};
pub use reservation::{Reservation, ReservationLocal, ReservationStatus};
pub use student::{Student, StudentStatus};

/// Case-insensitive substring match used by the list views.
pub(crate) fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}
