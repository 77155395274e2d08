//! Keeps reservations, students and books live against the REST API and
//! logs the dashboard each poll cycle.
//!
//! ```text
//! SHELF_SYNC_API_URL=https://api.example.com SHELF_SYNC_TOKEN=... shelf-watch
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use chrono::{Local, Utc};
use shelf_sync::aggregate::{monthly_report, status_counts};
use shelf_sync::models::{Book, Reservation, ReservationLocal, Student};
use shelf_sync::{
    logging, Dashboard, HttpSource, InsertAt, LiveCollection, ReconcilingStore, RefreshThread,
    StatusRules, SyncConfig, SyncError,
};

fn main() -> ExitCode {
    logging::init("shelf-watch");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "shelf-watch stopped");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = SyncConfig::from_env()?;
    tracing::info!(api = %config.api_url, poll_secs = config.poll_interval.as_secs(), "starting");

    let reservations: LiveCollection<Reservation, ReservationLocal> = LiveCollection::new(
        Arc::new(HttpSource::from_config(&config, Reservation::endpoint())?),
        ReconcilingStore::new().with_filter(Reservation::is_listed),
    );
    let students: LiveCollection<Student> = LiveCollection::new(
        Arc::new(HttpSource::from_config(&config, Student::endpoint())?),
        ReconcilingStore::new(),
    );
    let books: LiveCollection<Book> = LiveCollection::new(
        Arc::new(HttpSource::from_config(&config, Book::endpoint())?),
        ReconcilingStore::new().with_insert_at(InsertAt::Back),
    );

    reservations.initialize()?;
    students.initialize()?;
    books.initialize()?;

    let pollers = [
        RefreshThread::spawn(reservations.clone(), config.poll_interval),
        RefreshThread::spawn(students.clone(), config.poll_interval),
        RefreshThread::spawn(books.clone(), config.poll_interval),
    ];

    let rules = StatusRules::reservations();
    let mut dashboard = Dashboard::new(rules);
    loop {
        let stats = students.read(|s| {
            books.read(|b| reservations.read(|r| dashboard.stats(s, b, r, Utc::now())))
        })???;
        let held = reservations.records()?;
        tracing::info!(
            total_students = stats.total_students,
            total_books = stats.total_books,
            books_borrowed = stats.books_borrowed,
            overdue_books = stats.overdue_books,
            statuses = ?status_counts(&held),
            "dashboard"
        );
        for month in monthly_report(&held, &rules, &Local) {
            tracing::info!(
                month = %month.month,
                borrowed = month.borrowed,
                returned = month.returned,
                "monthly"
            );
        }

        if pollers.iter().any(RefreshThread::is_finished) {
            break;
        }
        thread::sleep(config.poll_interval);
    }

    let stats: Vec<_> = pollers.into_iter().map(RefreshThread::stop).collect();
    if stats.iter().any(|s| s.stopped_on_auth) {
        return Err(SyncError::Auth("session expired".into()).into());
    }
    Ok(())
}
