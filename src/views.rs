//! Search and status filters applied to collection snapshots by the list
//! pages. Matching is case-insensitive.

use crate::models::{Book, Reservation, Student};
use crate::record::Populated;
use crate::store::Entry;

/// A status tab: everything, or one status compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(String),
}

impl StatusFilter {
    pub fn only(status: impl Into<String>) -> Self {
        StatusFilter::Only(status.into())
    }

    pub fn matches(&self, status: Option<&str>) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => status.is_some_and(|s| s.eq_ignore_ascii_case(wanted)),
        }
    }
}

impl From<&str> for StatusFilter {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            StatusFilter::All
        } else {
            StatusFilter::only(value)
        }
    }
}

/// The reservations page: search by student name, student code or book
/// title, plus a status tab.
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub search: String,
    pub status: StatusFilter,
}

impl ReservationFilter {
    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.matches_search(reservation)
            && self.status.matches(Some(reservation.status.as_str()))
    }

    fn matches_search(&self, reservation: &Reservation) -> bool {
        let query = self.search.to_lowercase();
        if query.is_empty() {
            return true;
        }
        let student = reservation.student.as_ref().and_then(Populated::object);
        let book = reservation.book.as_ref().and_then(Populated::object);
        let fields = [
            student.map(|s| s.first_name.as_str()),
            student.map(|s| s.last_name.as_str()),
            student.map(|s| s.student_id.as_str()),
            book.map(|b| b.title.as_str()),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&query))
    }

    pub fn apply<'a, L>(&self, entries: &'a [Entry<Reservation, L>]) -> Vec<&'a Entry<Reservation, L>> {
        entries.iter().filter(|e| self.matches(&e.record)).collect()
    }
}

/// The accounts page: search by full name or student code, plus a status
/// tab.
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub search: String,
    pub status: StatusFilter,
}

impl StudentFilter {
    pub fn matches(&self, student: &Student) -> bool {
        student.matches_search(&self.search)
            && self
                .status
                .matches(student.status.as_ref().map(|s| s.as_str()))
    }

    pub fn apply<'a>(&self, students: &'a [Student]) -> Vec<&'a Student> {
        students.iter().filter(|s| self.matches(s)).collect()
    }
}

/// The catalogue page: title, author or category.
pub fn search_books<'a>(books: &'a [Book], query: &str) -> Vec<&'a Book> {
    books.iter().filter(|b| b.matches_search(query)).collect()
}
