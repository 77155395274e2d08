//! Derived aggregates - summary counts computed from a collection snapshot.
//!
//! Every function here is pure over its input records. Overdue detection
//! takes the observation time as an argument; nothing is marked overdue in
//! the background.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{Book, Reservation, Student};
use crate::store::ReconcilingStore;

/// Lifecycle fields read by the aggregator.
pub trait Lifecycle {
    /// Status label, matched case-sensitively.
    fn status(&self) -> &str;

    /// Preferred date for monthly bucketing.
    fn primary_date(&self) -> Option<DateTime<Utc>>;

    /// Used when the primary date is absent.
    fn fallback_date(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn due_date(&self) -> Option<DateTime<Utc>>;
}

/// Which status labels count as opened, closed, borrowed and active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRules {
    pub opened: &'static [&'static str],
    pub closed: &'static [&'static str],
    pub borrowed: &'static [&'static str],
    /// The only status that can be overdue.
    pub active: &'static str,
}

impl StatusRules {
    pub const fn reservations() -> Self {
        StatusRules {
            opened: &["approved"],
            closed: &["returned", "completed"],
            borrowed: &["approved", "completed"],
            active: "approved",
        }
    }

    pub fn is_opened(&self, status: &str) -> bool {
        self.opened.iter().any(|s| *s == status)
    }

    pub fn is_closed(&self, status: &str) -> bool {
        self.closed.iter().any(|s| *s == status)
    }

    pub fn is_borrowed(&self, status: &str) -> bool {
        self.borrowed.iter().any(|s| *s == status)
    }
}

impl Default for StatusRules {
    fn default() -> Self {
        Self::reservations()
    }
}

/// Count records per status label. Statuses with no records are absent.
pub fn status_counts<'a, R, I>(records: I) -> BTreeMap<String, usize>
where
    R: Lifecycle + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.status().to_string()).or_insert(0) += 1;
    }
    counts
}

/// Opened and closed counts for one month label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyStat {
    pub month: String,
    pub borrowed: usize,
    pub returned: usize,
}

/// Bucket records by the short month name of their primary (else fallback)
/// date in `tz`. Records with neither date are skipped. Buckets appear in
/// the order their first record was seen.
///
/// The label carries no year: March 2024 and March 2025 share one bucket.
pub fn monthly_report<'a, R, I, Tz>(records: I, rules: &StatusRules, tz: &Tz) -> Vec<MonthlyStat>
where
    R: Lifecycle + 'a,
    I: IntoIterator<Item = &'a R>,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut report: Vec<MonthlyStat> = Vec::new();
    for record in records {
        let Some(date) = record.primary_date().or_else(|| record.fallback_date()) else {
            continue;
        };
        let month = date.with_timezone(tz).format("%b").to_string();
        let index = match report.iter().position(|stat| stat.month == month) {
            Some(index) => index,
            None => {
                report.push(MonthlyStat {
                    month,
                    borrowed: 0,
                    returned: 0,
                });
                report.len() - 1
            }
        };
        let status = record.status();
        if rules.is_opened(status) {
            report[index].borrowed += 1;
        }
        if rules.is_closed(status) {
            report[index].returned += 1;
        }
    }
    report
}

/// Active, with a due date strictly before `now`.
pub fn is_overdue<R: Lifecycle>(record: &R, rules: &StatusRules, now: DateTime<Utc>) -> bool {
    record.status() == rules.active && record.due_date().is_some_and(|due| due < now)
}

pub fn overdue_count<'a, R, I>(records: I, rules: &StatusRules, now: DateTime<Utc>) -> usize
where
    R: Lifecycle + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .filter(|record| is_overdue(*record, rules, now))
        .count()
}

pub fn borrowed_count<'a, R, I>(records: I, rules: &StatusRules) -> usize
where
    R: Lifecycle + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .filter(|record| rules.is_borrowed(record.status()))
        .count()
}

/// The four dashboard cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_students: usize,
    pub total_books: usize,
    pub books_borrowed: usize,
    pub overdue_books: usize,
}

impl DashboardStats {
    pub fn compute(
        students: &[Student],
        books: &[Book],
        reservations: &[Reservation],
        rules: &StatusRules,
        now: DateTime<Utc>,
    ) -> Self {
        DashboardStats {
            total_students: students.len(),
            total_books: books.len(),
            books_borrowed: borrowed_count(reservations, rules),
            overdue_books: overdue_count(reservations, rules, now),
        }
    }
}

type Revisions = (u64, u64, u64);

/// Dashboard stats memoized on the revisions of the three stores.
///
/// Totals and the borrowed count are reused while no store has changed.
/// The overdue count depends on the clock and is recounted on every call.
#[derive(Debug, Default)]
pub struct Dashboard {
    rules: StatusRules,
    cached: Option<(Revisions, DashboardStats)>,
    recomputed: usize,
}

impl Dashboard {
    pub fn new(rules: StatusRules) -> Self {
        Dashboard {
            rules,
            cached: None,
            recomputed: 0,
        }
    }

    pub fn stats<SL, BL, RL>(
        &mut self,
        students: &ReconcilingStore<Student, SL>,
        books: &ReconcilingStore<Book, BL>,
        reservations: &ReconcilingStore<Reservation, RL>,
        now: DateTime<Utc>,
    ) -> DashboardStats
    where
        SL: Default + Clone,
        BL: Default + Clone,
        RL: Default + Clone,
    {
        let revisions = (students.revision(), books.revision(), reservations.revision());
        let held = reservations.records();

        let mut stats = match self.cached {
            Some((cached_at, stats)) if cached_at == revisions => stats,
            _ => {
                self.recomputed += 1;
                let stats = DashboardStats {
                    total_students: students.len(),
                    total_books: books.len(),
                    books_borrowed: borrowed_count(&held, &self.rules),
                    overdue_books: 0,
                };
                self.cached = Some((revisions, stats));
                stats
            }
        };
        stats.overdue_books = overdue_count(&held, &self.rules, now);
        stats
    }

    /// Number of times the cached totals were rebuilt.
    pub fn recomputed(&self) -> usize {
        self.recomputed
    }
}
