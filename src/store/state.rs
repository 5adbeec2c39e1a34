//! Plain state held behind the store's lock, plus the per-operation
//! lifecycle bookkeeping.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::StoreError;
use crate::models::{Appointment, AppointmentId};

// ═══════════════════════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════════════════════

/// Store operations that suspend on a remote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Fetch,
    FetchOne,
    Schedule,
    Cancel,
    Reschedule,
    UpdateStatus,
}

impl Operation {
    pub const COUNT: usize = 6;

    pub const ALL: [Operation; Self::COUNT] = [
        Operation::Fetch,
        Operation::FetchOne,
        Operation::Schedule,
        Operation::Cancel,
        Operation::Reschedule,
        Operation::UpdateStatus,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Error surfaced when the remote call for this operation fails.
    pub fn failure(self) -> StoreError {
        match self {
            Operation::Fetch => StoreError::FetchFailed,
            Operation::FetchOne => StoreError::FetchOneFailed,
            Operation::Schedule => StoreError::CreateFailed,
            Operation::Cancel => StoreError::CancelFailed,
            Operation::Reschedule => StoreError::RescheduleFailed,
            Operation::UpdateStatus => StoreError::UpdateStatusFailed,
        }
    }

    /// Loads replace state wholesale, so only the newest response of the kind
    /// may land. Mutations always apply to the latest collection.
    pub fn drops_stale_responses(self) -> bool {
        matches!(self, Operation::Fetch | Operation::FetchOne)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch appointments"),
            Self::FetchOne => write!(f, "fetch appointment"),
            Self::Schedule => write!(f, "schedule appointment"),
            Self::Cancel => write!(f, "cancel appointment"),
            Self::Reschedule => write!(f, "reschedule appointment"),
            Self::UpdateStatus => write!(f, "update appointment status"),
        }
    }
}

/// Lifecycle of one operation kind: `idle → loading → succeeded | failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Idle,
    Loading,
    Succeeded,
    Failed(StoreError),
}

impl OperationStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, OperationStatus::Loading)
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            OperationStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Bookkeeping for one operation kind.
#[derive(Debug, Default, Clone)]
pub(crate) struct OpSlot {
    /// Token handed to the most recently issued request.
    issued: u64,
    /// Requests started but not yet settled.
    in_flight: usize,
    /// Outcome of the most recently applied request.
    last: Option<Result<(), StoreError>>,
}

impl OpSlot {
    fn status(&self) -> OperationStatus {
        if self.in_flight > 0 {
            return OperationStatus::Loading;
        }
        match &self.last {
            None => OperationStatus::Idle,
            Some(Ok(())) => OperationStatus::Succeeded,
            Some(Err(err)) => OperationStatus::Failed(err.clone()),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// StoreState
// ═══════════════════════════════════════════════════════════

/// Everything the store guards.
///
/// `appointments` is never mutated in place: every change builds a new slice
/// and swaps it in, so a reader holding an `Arc` sees a complete version.
#[derive(Debug)]
pub(crate) struct StoreState {
    pub(crate) appointments: Arc<[Appointment]>,
    pub(crate) selected: Option<Appointment>,
    slots: [OpSlot; Operation::COUNT],
    /// Failure of the most recently applied request of any kind.
    latest_error: Option<StoreError>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            appointments: Arc::from(Vec::new()),
            selected: None,
            slots: Default::default(),
            latest_error: None,
        }
    }
}

impl StoreState {
    // ── Lifecycle ───────────────────────────────────────────

    /// Mark a request of kind `op` as issued; returns its token.
    pub(crate) fn begin(&mut self, op: Operation) -> u64 {
        let slot = &mut self.slots[op.index()];
        slot.issued += 1;
        slot.in_flight += 1;
        slot.issued
    }

    /// Release an in-flight request without recording an outcome.
    pub(crate) fn release(&mut self, op: Operation) {
        let slot = &mut self.slots[op.index()];
        slot.in_flight = slot.in_flight.saturating_sub(1);
    }

    /// Whether `token` still names the newest request of kind `op`.
    pub(crate) fn is_current(&self, op: Operation, token: u64) -> bool {
        self.slots[op.index()].issued == token
    }

    /// Record the outcome of an applied request.
    pub(crate) fn record<T>(&mut self, op: Operation, result: &Result<T, StoreError>) {
        let outcome = result.as_ref().map(|_| ()).map_err(|e| e.clone());
        self.latest_error = outcome.as_ref().err().cloned();
        self.slots[op.index()].last = Some(outcome);
    }

    pub(crate) fn status(&self, op: Operation) -> OperationStatus {
        self.slots[op.index()].status()
    }

    pub(crate) fn loading(&self) -> bool {
        self.slots.iter().any(|slot| slot.in_flight > 0)
    }

    pub(crate) fn latest_error(&self) -> Option<&StoreError> {
        self.latest_error.as_ref()
    }

    // ── Collection edits (copy-on-write) ────────────────────

    pub(crate) fn find(&self, id: &AppointmentId) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == *id)
    }

    /// Replace the whole collection, refreshing the selection if it is in the new list.
    pub(crate) fn replace_all(&mut self, appointments: Vec<Appointment>) {
        self.appointments = Arc::from(appointments);
        let fresh = self.selected.as_ref().and_then(|selected| {
            self.appointments
                .iter()
                .find(|a| a.id == selected.id)
                .cloned()
        });
        if fresh.is_some() {
            self.selected = fresh;
        }
    }

    /// Append a created appointment, or replace the element already holding its id.
    pub(crate) fn append(&mut self, appointment: Appointment) {
        if self.find(&appointment.id).is_some() {
            self.replace_one(appointment);
            return;
        }
        let mut next = self.appointments.to_vec();
        next.push(appointment);
        self.appointments = Arc::from(next);
    }

    /// Swap the element with the same id in place. Absent ids leave the list alone.
    pub(crate) fn replace_one(&mut self, appointment: Appointment) {
        if self.find(&appointment.id).is_some() {
            let next: Vec<Appointment> = self
                .appointments
                .iter()
                .map(|a| {
                    if a.id == appointment.id {
                        appointment.clone()
                    } else {
                        a.clone()
                    }
                })
                .collect();
            self.appointments = Arc::from(next);
        }
        if self.selected.as_ref().is_some_and(|s| s.id == appointment.id) {
            self.selected = Some(appointment);
        }
    }

    /// Remove the first element with `id`; returns whether anything was removed.
    pub(crate) fn remove(&mut self, id: &AppointmentId) -> bool {
        let Some(pos) = self.appointments.iter().position(|a| a.id == *id) else {
            return false;
        };
        let mut next = self.appointments.to_vec();
        next.remove(pos);
        self.appointments = Arc::from(next);
        if self.selected.as_ref().is_some_and(|s| s.id == *id) {
            self.selected = None;
        }
        true
    }

    pub(crate) fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            appointments: Arc::clone(&self.appointments),
            selected: self.selected.clone(),
            loading: self.loading(),
            error: self.latest_error.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// StoreSnapshot
// ═══════════════════════════════════════════════════════════

/// Consistent read-only view of the store at one instant.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub appointments: Arc<[Appointment]>,
    pub selected: Option<Appointment>,
    pub loading: bool,
    pub error: Option<StoreError>,
}

impl StoreSnapshot {
    /// Appointments that start after `now` and are not cancelled, in list order.
    pub fn upcoming(&self, now: NaiveDateTime) -> Vec<Appointment> {
        self.appointments
            .iter()
            .filter(|a| a.is_upcoming(now))
            .cloned()
            .collect()
    }
}
