//! Client-side appointment store.
//!
//! Single source of truth for the session's appointment list, the selected
//! appointment, and the lifecycle of each remote operation. Every async
//! operation suspends on exactly one request to the [`AppointmentApi`]; the
//! state lock is never held across that suspension.
//!
//! Lifecycle is tracked per [`Operation`] rather than in one shared
//! `loading`/`error` pair, so a failing schedule cannot hide a succeeding
//! fetch. `loading()` and `error()` remain as store-wide summaries.
//!
//! Loads (`Fetch`, `FetchOne`) carry a request token. When a newer load of the
//! same kind is issued before an older one resolves, the older response is
//! dropped on arrival and the call returns [`StoreError::Superseded`].

pub mod error;
pub mod state;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{NaiveDate, NaiveDateTime};

use crate::api::{ApiError, AppointmentApi, FetchScope, HttpAppointmentApi};
use crate::config::ClientConfig;
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, AppointmentTime, NewAppointment, UserId,
};

pub use error::StoreError;
pub use state::{Operation, OperationStatus, StoreSnapshot};

use state::StoreState;

// ═══════════════════════════════════════════════════════════
// AppointmentStore
// ═══════════════════════════════════════════════════════════

/// Appointment state shared between the UI and the remote service.
///
/// Wrap in `Arc` to share across tasks; all methods take `&self`.
pub struct AppointmentStore<A> {
    api: A,
    state: RwLock<StoreState>,
}

impl AppointmentStore<HttpAppointmentApi> {
    /// Store backed by the hospital REST API described by `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::new(HttpAppointmentApi::new(config)?))
    }
}

impl<A: AppointmentApi> AppointmentStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    // ── Reads ───────────────────────────────────────────────

    /// Current appointment list. Cheap to clone; later edits never change it.
    pub fn appointments(&self) -> Arc<[Appointment]> {
        Arc::clone(&self.read().appointments)
    }

    pub fn selected_appointment(&self) -> Option<Appointment> {
        self.read().selected.clone()
    }

    /// True while any operation is in flight.
    pub fn loading(&self) -> bool {
        self.read().loading()
    }

    /// Failure of the most recently completed operation, if it failed.
    pub fn error(&self) -> Option<StoreError> {
        self.read().latest_error().cloned()
    }

    pub fn status(&self, op: Operation) -> OperationStatus {
        self.read().status(op)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.read().snapshot()
    }

    /// Appointments starting after `now` that are not cancelled, in list order.
    pub fn upcoming(&self, now: NaiveDateTime) -> Vec<Appointment> {
        self.snapshot().upcoming(now)
    }

    // ── Selection (synchronous) ─────────────────────────────

    /// Select `appointment`. It does not have to be in the list.
    pub fn select_appointment(&self, appointment: Appointment) {
        self.write().selected = Some(appointment);
    }

    pub fn clear_selection(&self) {
        self.write().selected = None;
    }

    // ── Remote operations ───────────────────────────────────

    /// Replace the list with every appointment of `user_id`.
    ///
    /// On failure the previous list is kept. Returns the number loaded.
    pub async fn fetch_appointments(&self, user_id: &UserId) -> Result<usize, StoreError> {
        self.fetch_scoped(FetchScope::User(user_id.clone())).await
    }

    /// Replace the list with the appointments in `scope`.
    pub async fn fetch_scoped(&self, scope: FetchScope) -> Result<usize, StoreError> {
        let request = self.begin(Operation::Fetch);
        tracing::info!(?scope, "Fetching appointments");

        let result = self
            .api
            .list(&scope)
            .await
            .map_err(|e| remote_failure(Operation::Fetch, e));

        request.settle(|state| {
            let appointments = result?;
            let count = appointments.len();
            state.replace_all(appointments);
            tracing::info!(count, "Appointments loaded");
            Ok(count)
        })
    }

    /// Load one appointment and make it the selection.
    ///
    /// If the appointment is already in the list, that entry is refreshed too.
    pub async fn fetch_appointment(&self, id: &AppointmentId) -> Result<Appointment, StoreError> {
        let request = self.begin(Operation::FetchOne);
        tracing::info!(appointment_id = %id, "Fetching appointment");

        let result = self
            .api
            .get(id)
            .await
            .map_err(|e| remote_failure(Operation::FetchOne, e));

        request.settle(|state| {
            let appointment = result?;
            state.replace_one(appointment.clone());
            state.selected = Some(appointment.clone());
            Ok(appointment)
        })
    }

    /// Create `appointment` remotely and append the stored version to the list.
    ///
    /// Nothing is inserted before the service confirms.
    pub async fn schedule_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, StoreError> {
        let request = self.begin(Operation::Schedule);
        tracing::info!(
            patient_id = %appointment.patient_id,
            doctor_id = %appointment.doctor_id,
            date = %appointment.date,
            time = %appointment.time,
            "Scheduling appointment"
        );

        let result = self
            .api
            .create(&appointment)
            .await
            .map_err(|e| remote_failure(Operation::Schedule, e));

        request.settle(|state| {
            let created = result?;
            state.append(created.clone());
            tracing::info!(appointment_id = %created.id, "Appointment scheduled");
            Ok(created)
        })
    }

    /// Delete `id` remotely and drop it from the list.
    ///
    /// A 404 from the service means the appointment is already gone and counts
    /// as success. Removing an id that is not in the list is a no-op.
    pub async fn cancel_appointment(&self, id: &AppointmentId) -> Result<(), StoreError> {
        let request = self.begin(Operation::Cancel);
        tracing::info!(appointment_id = %id, "Cancelling appointment");

        let result = match self.api.delete(id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!(appointment_id = %id, "Appointment already deleted remotely");
                Ok(())
            }
            Err(e) => Err(remote_failure(Operation::Cancel, e)),
        };

        request.settle(|state| {
            result?;
            let removed = state.remove(id);
            tracing::info!(appointment_id = %id, removed, "Appointment cancelled");
            Ok(())
        })
    }

    /// Move a scheduled appointment to a new date and time.
    ///
    /// The appointment must be in the list and still `scheduled`; otherwise no
    /// request is sent. The list position is kept.
    pub async fn reschedule_appointment(
        &self,
        id: &AppointmentId,
        date: NaiveDate,
        time: AppointmentTime,
    ) -> Result<Appointment, StoreError> {
        let request = self.begin(Operation::Reschedule);

        let current = match self.local_copy(id) {
            Some(current) => current,
            None => return request.settle(|_| Err(StoreError::NotFound(id.clone()))),
        };
        if current.status != AppointmentStatus::Scheduled {
            return request.settle(|_| Err(StoreError::NotReschedulable(current.status)));
        }

        tracing::info!(appointment_id = %id, %date, %time, "Rescheduling appointment");
        let updated = Appointment {
            date,
            time,
            ..current
        };
        let result = self
            .api
            .update(&updated)
            .await
            .map_err(|e| remote_failure(Operation::Reschedule, e));

        request.settle(|state| {
            let stored = result?;
            state.replace_one(stored.clone());
            Ok(stored)
        })
    }

    /// Change the status of an appointment in the list.
    ///
    /// Only `scheduled → completed` and `scheduled → cancelled` are sent to
    /// the service; anything else fails locally with `InvalidTransition`.
    pub async fn update_status(
        &self,
        id: &AppointmentId,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let request = self.begin(Operation::UpdateStatus);

        let current = match self.local_copy(id) {
            Some(current) => current,
            None => return request.settle(|_| Err(StoreError::NotFound(id.clone()))),
        };
        if !current.status.can_transition_to(status) {
            let err = StoreError::InvalidTransition {
                from: current.status,
                to: status,
            };
            return request.settle(|_| Err(err));
        }

        tracing::info!(appointment_id = %id, from = %current.status, to = %status, "Updating appointment status");
        let updated = Appointment { status, ..current };
        let result = self
            .api
            .update(&updated)
            .await
            .map_err(|e| remote_failure(Operation::UpdateStatus, e));

        request.settle(|state| {
            let stored = result?;
            state.replace_one(stored.clone());
            Ok(stored)
        })
    }

    // ── Internal ────────────────────────────────────────────

    fn local_copy(&self, id: &AppointmentId) -> Option<Appointment> {
        self.read().find(id).cloned()
    }

    fn begin(&self, op: Operation) -> InFlight<'_> {
        let token = self.write().begin(op);
        InFlight {
            state: &self.state,
            op,
            token,
            settled: false,
        }
    }

    // Every edit swaps whole values in, so a poisoned lock still guards a
    // complete state.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn remote_failure(op: Operation, error: ApiError) -> StoreError {
    if error.is_transport() {
        tracing::warn!(operation = %op, error = %error, "Appointment service unreachable");
    } else {
        tracing::error!(operation = %op, error = %error, "Appointment request failed");
    }
    op.failure()
}

// ═══════════════════════════════════════════════════════════
// InFlight — RAII request token
// ═══════════════════════════════════════════════════════════

/// One issued request.
///
/// `settle` applies the outcome under the write lock. Dropping an unsettled
/// request (the caller dropped the future mid-flight) only releases it, so
/// `loading` never sticks.
struct InFlight<'a> {
    state: &'a RwLock<StoreState>,
    op: Operation,
    token: u64,
    settled: bool,
}

impl InFlight<'_> {
    fn settle<T>(
        mut self,
        apply: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.settled = true;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.release(self.op);

        if self.op.drops_stale_responses() && !state.is_current(self.op, self.token) {
            tracing::debug!(operation = %self.op, token = self.token, "Discarding superseded response");
            return Err(StoreError::Superseded);
        }

        let result = apply(&mut *state);
        state.record(self.op, &result);
        result
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(operation = %self.op, "Request dropped before completion");
            self.state
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .release(self.op);
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::Poll;
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::oneshot;

    use crate::api::{MockAppointmentApi, MockCall};
    use crate::models::AppointmentType;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn aid(s: &str) -> AppointmentId {
        AppointmentId::new(s).unwrap()
    }

    fn appt(id: &str, patient: &str) -> Appointment {
        serde_json::from_value(json!({
            "id": id,
            "patientId": patient,
            "doctorId": "d1",
            "date": "2024-01-10",
            "time": "09:00",
            "status": "scheduled",
            "type": "checkup"
        }))
        .unwrap()
    }

    fn consultation() -> NewAppointment {
        NewAppointment {
            patient_id: uid("p1"),
            doctor_id: uid("d1"),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            time: "14:30".parse().unwrap(),
            status: AppointmentStatus::Scheduled,
            appointment_type: AppointmentType::Consultation,
            notes: None,
        }
    }

    fn store_with(records: Vec<Appointment>) -> AppointmentStore<MockAppointmentApi> {
        AppointmentStore::new(MockAppointmentApi::with_records(records))
    }

    /// Store whose local list already holds `records`.
    async fn loaded_store(records: Vec<Appointment>) -> AppointmentStore<MockAppointmentApi> {
        let store = store_with(records);
        store.fetch_appointments(&uid("p1")).await.unwrap();
        store
    }

    // ── Initial state & selection ───────────────────────────

    #[test]
    fn starts_empty_and_idle() {
        let store = AppointmentStore::new(MockAppointmentApi::new());
        assert!(store.appointments().is_empty());
        assert!(store.selected_appointment().is_none());
        assert!(!store.loading());
        assert!(store.error().is_none());
        for op in Operation::ALL {
            assert_eq!(store.status(op), OperationStatus::Idle);
        }
    }

    #[test]
    fn select_is_synchronous_and_needs_no_membership() {
        let store = AppointmentStore::new(MockAppointmentApi::new());
        let outsider = appt("99", "p7");

        store.select_appointment(outsider.clone());
        assert_eq!(store.selected_appointment(), Some(outsider));
        assert!(!store.loading());
        assert!(store.api().calls().is_empty());

        store.clear_selection();
        assert!(store.selected_appointment().is_none());
    }

    // ── Fetch ───────────────────────────────────────────────

    #[tokio::test]
    async fn fetch_replaces_list_with_service_order() {
        let store = store_with(vec![appt("1", "p1")]);

        let count = store.fetch_appointments(&uid("p1")).await.unwrap();

        assert_eq!(count, 1);
        let list = store.appointments();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0], appt("1", "p1"));
        assert!(!store.loading());
        assert!(store.error().is_none());
        assert_eq!(store.status(Operation::Fetch), OperationStatus::Succeeded);
    }

    #[tokio::test]
    async fn fetch_replaces_previous_collection_wholesale() {
        let store = store_with(vec![appt("3", "p1"), appt("1", "p2"), appt("2", "p1")]);
        store.fetch_appointments(&uid("p2")).await.unwrap();
        store.fetch_appointments(&uid("p1")).await.unwrap();

        let ids: Vec<String> = store.appointments().iter().map(|a| a.id.to_string()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_list() {
        let store = loaded_store(vec![appt("1", "p1")]).await;
        store
            .api()
            .fail_next(MockCall::List, ApiError::Connection("http://127.0.0.1:8000/api".into()));

        let err = store.fetch_appointments(&uid("p1")).await.unwrap_err();

        assert_eq!(err, StoreError::FetchFailed);
        assert_eq!(store.appointments().len(), 1);
        assert!(!store.loading());
        assert_eq!(
            store.error().map(|e| e.to_string()),
            Some("Failed to fetch appointments".to_string())
        );
    }

    #[tokio::test]
    async fn all_remote_failure_kinds_read_the_same() {
        for failure in [
            ApiError::Timeout,
            ApiError::Status {
                status: 502,
                body: "bad gateway".into(),
            },
            ApiError::ResponseParsing("expected value at line 1".into()),
        ] {
            let store = store_with(vec![]);
            store.api().fail_next(MockCall::List, failure);
            let err = store.fetch_appointments(&uid("p1")).await.unwrap_err();
            assert_eq!(err.to_string(), "Failed to fetch appointments");
        }
    }

    #[tokio::test]
    async fn next_success_clears_error() {
        let store = store_with(vec![appt("1", "p1")]);
        store.api().fail_next(MockCall::List, ApiError::Timeout);
        assert!(store.fetch_appointments(&uid("p1")).await.is_err());
        assert!(store.error().is_some());

        store.fetch_appointments(&uid("p1")).await.unwrap();
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn fetch_refreshes_selected_appointment() {
        let mut fresh = appt("1", "p1");
        fresh.notes = Some("new".into());
        let store = store_with(vec![fresh.clone()]);

        let mut stale = appt("1", "p1");
        stale.notes = Some("old".into());
        store.select_appointment(stale);

        store.fetch_appointments(&uid("p1")).await.unwrap();
        assert_eq!(store.selected_appointment(), Some(fresh));
    }

    // ── Schedule ────────────────────────────────────────────

    #[tokio::test]
    async fn schedule_appends_server_copy_at_tail() {
        let store = AppointmentStore::new(
            MockAppointmentApi::with_records(vec![appt("1", "p1")]).with_next_id(42),
        );
        store.fetch_appointments(&uid("p1")).await.unwrap();

        let created = store.schedule_appointment(consultation()).await.unwrap();

        let list = store.appointments();
        assert_eq!(list.len(), 2);
        assert_eq!(created.id.as_str(), "42");
        assert_eq!(list.last().unwrap().id.as_str(), "42");
        assert_eq!(list.last().unwrap().appointment_type, AppointmentType::Consultation);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn failed_schedule_inserts_nothing() {
        let store = loaded_store(vec![appt("1", "p1")]).await;
        let before = store.appointments();
        store.api().fail_next(
            MockCall::Create,
            ApiError::Status {
                status: 422,
                body: "doctor unavailable".into(),
            },
        );

        let err = store.schedule_appointment(consultation()).await.unwrap_err();

        assert_eq!(err, StoreError::CreateFailed);
        assert_eq!(store.appointments(), before);
        assert_eq!(store.error(), Some(StoreError::CreateFailed));
    }

    // ── Cancel ──────────────────────────────────────────────

    #[tokio::test]
    async fn cancel_removes_appointment() {
        let store = loaded_store(vec![appt("1", "p1")]).await;

        store.cancel_appointment(&aid("1")).await.unwrap();

        assert!(store.appointments().is_empty());
        assert!(!store.loading());
        assert!(store.api().records().is_empty());
    }

    #[tokio::test]
    async fn cancel_twice_is_idempotent() {
        let store = loaded_store(vec![appt("1", "p1"), appt("2", "p1")]).await;

        store.cancel_appointment(&aid("1")).await.unwrap();
        let after_first = store.appointments();
        // The service answers 404 the second time.
        store.cancel_appointment(&aid("1")).await.unwrap();

        assert_eq!(store.appointments(), after_first);
        assert_eq!(store.api().call_count(MockCall::Delete), 2);
    }

    #[tokio::test]
    async fn repeated_cancel_with_remote_failure_leaves_list_alone() {
        let store = loaded_store(vec![appt("1", "p1"), appt("2", "p1")]).await;
        store.cancel_appointment(&aid("1")).await.unwrap();
        let after_first = store.appointments();

        store.api().fail_next(MockCall::Delete, ApiError::Timeout);
        let err = store.cancel_appointment(&aid("1")).await.unwrap_err();

        assert_eq!(err, StoreError::CancelFailed);
        assert_eq!(store.appointments(), after_first);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn failed_cancel_keeps_appointment() {
        let store = loaded_store(vec![appt("1", "p1")]).await;
        store
            .api()
            .fail_next(MockCall::Delete, ApiError::Connection("down".into()));

        assert_eq!(
            store.cancel_appointment(&aid("1")).await,
            Err(StoreError::CancelFailed)
        );
        assert_eq!(store.appointments().len(), 1);
    }

    #[tokio::test]
    async fn cancel_clears_selection_of_removed_appointment() {
        let store = loaded_store(vec![appt("1", "p1")]).await;
        store.select_appointment(appt("1", "p1"));

        store.cancel_appointment(&aid("1")).await.unwrap();
        assert!(store.selected_appointment().is_none());
    }

    // ── Fetch one ───────────────────────────────────────────

    #[tokio::test]
    async fn fetch_appointment_selects_it() {
        let store = store_with(vec![appt("5", "p3")]);

        let loaded = store.fetch_appointment(&aid("5")).await.unwrap();

        assert_eq!(store.selected_appointment(), Some(loaded));
        // Not part of the list until a fetch brings it in.
        assert!(store.appointments().is_empty());
    }

    #[tokio::test]
    async fn fetch_appointment_failure_keeps_selection() {
        let store = store_with(vec![]);
        store.select_appointment(appt("1", "p1"));

        let err = store.fetch_appointment(&aid("404")).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to load appointment details");
        assert_eq!(store.selected_appointment(), Some(appt("1", "p1")));
    }

    // ── Reschedule & status ─────────────────────────────────

    #[tokio::test]
    async fn reschedule_updates_in_place() {
        let store = loaded_store(vec![appt("1", "p1"), appt("2", "p1")]).await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        let time: AppointmentTime = "16:15".parse().unwrap();

        let moved = store
            .reschedule_appointment(&aid("1"), date, time)
            .await
            .unwrap();

        assert_eq!(moved.date, date);
        let list = store.appointments();
        assert_eq!(list[0].id.as_str(), "1");
        assert_eq!(list[0].time, time);
        assert_eq!(store.api().records()[0].time, time);
    }

    #[tokio::test]
    async fn reschedule_unknown_sends_nothing() {
        let store = store_with(vec![]);
        let err = store
            .reschedule_appointment(
                &aid("7"),
                NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
                "10:00".parse().unwrap(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::NotFound(aid("7")));
        assert_eq!(store.api().call_count(MockCall::Update), 0);
        assert_eq!(
            store.status(Operation::Reschedule),
            OperationStatus::Failed(StoreError::NotFound(aid("7")))
        );
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn reschedule_requires_scheduled_status() {
        let mut done = appt("1", "p1");
        done.status = AppointmentStatus::Completed;
        let store = loaded_store(vec![done]).await;

        let err = store
            .reschedule_appointment(
                &aid("1"),
                NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
                "10:00".parse().unwrap(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::NotReschedulable(AppointmentStatus::Completed));
        assert_eq!(store.api().call_count(MockCall::Update), 0);
    }

    #[tokio::test]
    async fn update_status_follows_allowed_transitions() {
        let store = loaded_store(vec![appt("1", "p1")]).await;

        let done = store
            .update_status(&aid("1"), AppointmentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
        assert_eq!(store.appointments()[0].status, AppointmentStatus::Completed);

        let err = store
            .update_status(&aid("1"), AppointmentStatus::Cancelled)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidTransition {
                from: AppointmentStatus::Completed,
                to: AppointmentStatus::Cancelled,
            }
        );
        assert_eq!(store.api().call_count(MockCall::Update), 1);
        assert_eq!(store.appointments()[0].status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn failed_status_update_keeps_old_status() {
        let store = loaded_store(vec![appt("1", "p1")]).await;
        store.api().fail_next(MockCall::Update, ApiError::Timeout);

        let err = store
            .update_status(&aid("1"), AppointmentStatus::Cancelled)
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::UpdateStatusFailed);
        assert_eq!(store.appointments()[0].status, AppointmentStatus::Scheduled);
    }

    // ── Per-operation status ────────────────────────────────

    #[tokio::test]
    async fn operations_do_not_clobber_each_other() {
        let store = store_with(vec![appt("1", "p1")]);
        store.api().fail_next(MockCall::Create, ApiError::Timeout);

        assert!(store.schedule_appointment(consultation()).await.is_err());
        store.fetch_appointments(&uid("p1")).await.unwrap();

        assert_eq!(
            store.status(Operation::Schedule),
            OperationStatus::Failed(StoreError::CreateFailed)
        );
        assert_eq!(store.status(Operation::Fetch), OperationStatus::Succeeded);
        // Store-wide summary follows the most recent completion.
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn upcoming_view_uses_list() {
        let mut later = appt("2", "p1");
        later.date = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        let store = loaded_store(vec![appt("1", "p1"), later]).await;

        let now = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let upcoming = store.upcoming(now);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id.as_str(), "2");
    }

    // ── Ordering & supersession ─────────────────────────────

    /// Service whose list responses are released by the test, per user id.
    struct GatedApi {
        gates: Mutex<HashMap<String, oneshot::Receiver<Result<Vec<Appointment>, ApiError>>>>,
    }

    impl GatedApi {
        fn new() -> Self {
            Self {
                gates: Mutex::new(HashMap::new()),
            }
        }

        fn gate(&self, user: &str) -> oneshot::Sender<Result<Vec<Appointment>, ApiError>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(user.to_string(), rx);
            tx
        }
    }

    impl AppointmentApi for GatedApi {
        async fn list(&self, scope: &FetchScope) -> Result<Vec<Appointment>, ApiError> {
            let rx = self
                .gates
                .lock()
                .unwrap()
                .remove(scope.user_id().as_str())
                .expect("no gate for user");
            rx.await.unwrap_or(Err(ApiError::Http("gate closed".into())))
        }

        async fn get(&self, _id: &AppointmentId) -> Result<Appointment, ApiError> {
            Err(ApiError::Http("unused".into()))
        }

        async fn create(&self, _a: &NewAppointment) -> Result<Appointment, ApiError> {
            Err(ApiError::Http("unused".into()))
        }

        async fn delete(&self, _id: &AppointmentId) -> Result<(), ApiError> {
            Err(ApiError::Http("unused".into()))
        }

        async fn update(&self, _a: &Appointment) -> Result<Appointment, ApiError> {
            Err(ApiError::Http("unused".into()))
        }
    }

    /// Poll `fut` exactly once.
    async fn poll_once<F: Future>(mut fut: Pin<&mut F>) -> Poll<F::Output> {
        std::future::poll_fn(move |cx| Poll::Ready(fut.as_mut().poll(cx))).await
    }

    #[tokio::test]
    async fn older_fetch_resolving_last_is_discarded() {
        let api = GatedApi::new();
        let gate_a = api.gate("a");
        let gate_b = api.gate("b");
        let store = AppointmentStore::new(api);
        let (a, b) = (uid("a"), uid("b"));

        let first = store.fetch_appointments(&a);
        let second = store.fetch_appointments(&b);
        tokio::pin!(first, second);

        // Issue a, then b; both park on their gates.
        assert!(poll_once(first.as_mut()).await.is_pending());
        assert!(poll_once(second.as_mut()).await.is_pending());
        assert!(store.loading());
        assert!(store.status(Operation::Fetch).is_loading());

        // b resolves first and lands.
        gate_b.send(Ok(vec![appt("b1", "b")])).unwrap();
        assert_eq!(second.await, Ok(1));
        assert!(store.loading());

        // a resolves last and is dropped.
        gate_a.send(Ok(vec![appt("a1", "a")])).unwrap();
        assert_eq!(first.await, Err(StoreError::Superseded));

        let list = store.appointments();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id.as_str(), "b1");
        assert!(!store.loading());
        assert_eq!(store.status(Operation::Fetch), OperationStatus::Succeeded);
    }

    #[tokio::test]
    async fn superseded_failure_does_not_set_error() {
        let api = GatedApi::new();
        let gate_a = api.gate("a");
        let gate_b = api.gate("b");
        let store = AppointmentStore::new(api);
        let (a, b) = (uid("a"), uid("b"));

        let first = store.fetch_appointments(&a);
        let second = store.fetch_appointments(&b);
        tokio::pin!(first, second);
        assert!(poll_once(first.as_mut()).await.is_pending());
        assert!(poll_once(second.as_mut()).await.is_pending());

        gate_b.send(Ok(vec![])).unwrap();
        assert_eq!(second.await, Ok(0));
        gate_a.send(Err(ApiError::Timeout)).unwrap();
        assert_eq!(first.await, Err(StoreError::Superseded));

        assert!(store.error().is_none());
        assert_eq!(store.status(Operation::Fetch), OperationStatus::Succeeded);
    }

    #[tokio::test]
    async fn dropped_request_does_not_leave_loading_set() {
        let api = GatedApi::new();
        let _gate = api.gate("slow");
        let store = AppointmentStore::new(api);

        let outcome =
            tokio::time::timeout(Duration::from_millis(20), store.fetch_appointments(&uid("slow")))
                .await;

        assert!(outcome.is_err(), "fetch should still be pending");
        assert!(!store.loading());
        assert_eq!(store.status(Operation::Fetch), OperationStatus::Idle);
    }

    #[tokio::test]
    async fn store_is_shareable_across_tasks() {
        let store = Arc::new(store_with(vec![appt("1", "p1"), appt("2", "p2")]));

        let handles: Vec<_> = ["p1", "p2"]
            .into_iter()
            .map(|user| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.fetch_appointments(&uid(user)).await })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        // Each user has one appointment, so whichever load lands leaves one entry.
        assert!(outcomes.iter().any(|r| r.is_ok()));
        assert_eq!(store.appointments().len(), 1);
        assert!(!store.loading());
    }
}
