use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{ApiError, AppointmentApi, FetchScope};
use crate::models::{Appointment, AppointmentId, NewAppointment};

/// Kinds of request the mock records and can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    List,
    Get,
    Create,
    Delete,
    Update,
}

#[derive(Default)]
struct MockState {
    records: Vec<Appointment>,
    next_id: u64,
    calls: Vec<MockCall>,
    failures: HashMap<MockCall, Vec<ApiError>>,
}

/// In-memory appointment service.
///
/// Assigns sequential numeric ids, answers deletes of unknown ids with 404,
/// and can be scripted to fail upcoming calls of a given kind.
pub struct MockAppointmentApi {
    state: Mutex<MockState>,
}

impl MockAppointmentApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 1,
                ..MockState::default()
            }),
        }
    }

    /// Start with `records` already stored, in this order.
    pub fn with_records(records: Vec<Appointment>) -> Self {
        let mock = Self::new();
        mock.lock().records = records;
        mock
    }

    /// Next id handed out by `create`.
    pub fn with_next_id(self, next_id: u64) -> Self {
        self.lock().next_id = next_id;
        self
    }

    /// Make the next call of kind `call` fail with `error`. Queued failures
    /// are consumed in order, one per call.
    pub fn fail_next(&self, call: MockCall, error: ApiError) {
        self.lock().failures.entry(call).or_default().push(error);
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, call: MockCall) -> usize {
        self.lock().calls.iter().filter(|c| **c == call).count()
    }

    /// Server-side records.
    pub fn records(&self) -> Vec<Appointment> {
        self.lock().records.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not wedge every later assertion.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `call` and pop a scripted failure if one is queued.
    fn begin(&self, call: MockCall) -> Result<MutexGuard<'_, MockState>, ApiError> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(queue) = state.failures.get_mut(&call) {
            if !queue.is_empty() {
                return Err(queue.remove(0));
            }
        }
        Ok(state)
    }
}

impl Default for MockAppointmentApi {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: &AppointmentId) -> ApiError {
    ApiError::Status {
        status: 404,
        body: format!("appointment {id} not found"),
    }
}

impl AppointmentApi for MockAppointmentApi {
    async fn list(&self, scope: &FetchScope) -> Result<Vec<Appointment>, ApiError> {
        let state = self.begin(MockCall::List)?;
        Ok(state
            .records
            .iter()
            .filter(|a| scope.matches(a))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &AppointmentId) -> Result<Appointment, ApiError> {
        let state = self.begin(MockCall::Get)?;
        state
            .records
            .iter()
            .find(|a| a.id == *id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, appointment: &NewAppointment) -> Result<Appointment, ApiError> {
        let mut state = self.begin(MockCall::Create)?;
        let id = AppointmentId::new(state.next_id.to_string())
            .map_err(|e| ApiError::ResponseParsing(e.to_string()))?;
        state.next_id += 1;
        let created = Appointment::from_new(id, appointment.clone());
        state.records.push(created.clone());
        Ok(created)
    }

    async fn delete(&self, id: &AppointmentId) -> Result<(), ApiError> {
        let mut state = self.begin(MockCall::Delete)?;
        let before = state.records.len();
        state.records.retain(|a| a.id != *id);
        if state.records.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, ApiError> {
        let mut state = self.begin(MockCall::Update)?;
        let slot = state
            .records
            .iter_mut()
            .find(|a| a.id == appointment.id)
            .ok_or_else(|| not_found(&appointment.id))?;
        *slot = appointment.clone();
        Ok(appointment.clone())
    }
}
