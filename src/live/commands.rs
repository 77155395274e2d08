//! Library admin commands on top of the generic write paths.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use super::LiveCollection;
use crate::error::SyncError;
use crate::models::{
    LogEntry, LogLocal, Reservation, ReservationLocal, ReservationStatus, Student, StudentStatus,
};

impl LiveCollection<Reservation, ReservationLocal> {
    /// Hold the due date an admin picked for a pending approval.
    pub fn set_pending_due_date(&self, id: &str, due: DateTime<Utc>) -> Result<bool, SyncError> {
        self.set_local(id, |local| local.pending_due_date = Some(due))
    }

    /// Approve with the pending due date. Fails locally if none was picked.
    pub fn approve_reservation(&self, id: &str) -> Result<Option<Reservation>, SyncError> {
        let due = self
            .get(id)?
            .ok_or_else(|| self.unknown(id))?
            .local
            .pending_due_date
            .ok_or_else(|| SyncError::Invalid("pick a due date before approving".into()))?;

        let patch = json!({
            "status": ReservationStatus::Approved.as_str(),
            "customDueDate": due.to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        let echo = self.update(id, &patch, |r| {
            r.status = ReservationStatus::Approved;
            r.due_date = Some(due);
        })?;
        self.set_local(id, |local| local.pending_due_date = None)?;
        Ok(echo)
    }

    pub fn return_reservation(&self, id: &str) -> Result<Option<Reservation>, SyncError> {
        self.set_status(id, ReservationStatus::Returned)
    }

    pub fn decline_reservation(&self, id: &str) -> Result<Option<Reservation>, SyncError> {
        self.set_status(id, ReservationStatus::Declined)
    }

    fn set_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> Result<Option<Reservation>, SyncError> {
        let patch = json!({ "status": status.as_str() });
        self.update(id, &patch, |r| r.status = status)
    }
}

impl<L> LiveCollection<Student, L>
where
    L: Default + Clone + Send + 'static,
{
    /// Activate an account and lift any reservation cooldown.
    pub fn verify_student(&self, id: &str) -> Result<Option<Student>, SyncError> {
        let patch = json!({
            "status": StudentStatus::Active.as_str(),
            "cooldownUntil": Value::Null,
            "activeReservations": 0,
        });
        self.update(id, &patch, |s| {
            s.status = Some(StudentStatus::Active);
            s.cooldown_until = None;
            s.active_reservations = Some(0);
        })
    }
}

impl LiveCollection<LogEntry, LogLocal> {
    /// Record a visit. The new log arrives over the push channel; the
    /// store is not touched here.
    pub fn time_in(&self, student_code: &str) -> Result<Option<LogEntry>, SyncError> {
        let code = student_code.trim();
        if code.is_empty() {
            return Err(SyncError::Invalid("enter a valid student ID".into()));
        }
        self.shared
            .source
            .create(&json!({ "studentId": code }))
            .map_err(|err| self.write_failed("time_in", None, err))
    }

    pub fn set_print_quantity(&self, log_id: &str, quantity: u32) -> Result<bool, SyncError> {
        self.set_local(log_id, |local| local.print_quantity = quantity)
    }

    /// Close a visit, sending the typed print quantity unless the visit was
    /// already printed.
    pub fn time_out(&self, log_id: &str) -> Result<Option<LogEntry>, SyncError> {
        let entry = self.get(log_id)?.ok_or_else(|| self.unknown(log_id))?;

        let mut body = Map::new();
        if !entry.record.already_printed && entry.local.print_quantity > 0 {
            body.insert("printCount".into(), json!(entry.local.print_quantity));
        }
        let echo = self.update_confirmed(log_id, &Value::Object(body))?;
        self.set_local(log_id, |local| local.print_quantity = 0)?;
        Ok(echo)
    }
}
