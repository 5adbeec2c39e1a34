//! Remote appointment service seam.
//!
//! `AppointmentApi` is what the store talks to. `HttpAppointmentApi` is the
//! production implementation over the hospital REST API; `MockAppointmentApi`
//! is an in-memory stand-in for tests and offline runs.

pub mod error;
pub mod http;
pub mod mock;

use std::future::Future;

use crate::models::{Appointment, AppointmentId, NewAppointment, UserId};

pub use error::ApiError;
pub use http::HttpAppointmentApi;
pub use mock::{MockAppointmentApi, MockCall};

/// Whose appointments a list request returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchScope {
    /// Every appointment the user takes part in: `GET /appointments/user/{id}`.
    User(UserId),
    /// Appointments where the user is the patient: `GET /appointments/?patient_id={id}`.
    Patient(UserId),
    /// Appointments where the user is the doctor: `GET /appointments/?doctor_id={id}`.
    Doctor(UserId),
}

impl FetchScope {
    pub fn user_id(&self) -> &UserId {
        match self {
            FetchScope::User(id) | FetchScope::Patient(id) | FetchScope::Doctor(id) => id,
        }
    }

    /// Whether `appointment` belongs in this scope.
    pub fn matches(&self, appointment: &Appointment) -> bool {
        match self {
            FetchScope::User(id) => appointment.patient_id == *id || appointment.doctor_id == *id,
            FetchScope::Patient(id) => appointment.patient_id == *id,
            FetchScope::Doctor(id) => appointment.doctor_id == *id,
        }
    }
}

/// Operations the store needs from the remote appointment service.
///
/// Each call suspends on exactly one request. Implementations must not retry.
pub trait AppointmentApi: Send + Sync {
    /// List appointments in `scope`, in service order.
    fn list(
        &self,
        scope: &FetchScope,
    ) -> impl Future<Output = Result<Vec<Appointment>, ApiError>> + Send;

    /// Load a single appointment.
    fn get(
        &self,
        id: &AppointmentId,
    ) -> impl Future<Output = Result<Appointment, ApiError>> + Send;

    /// Persist a new appointment; the returned value carries the assigned id.
    fn create(
        &self,
        appointment: &NewAppointment,
    ) -> impl Future<Output = Result<Appointment, ApiError>> + Send;

    /// Delete an appointment. Any response body is ignored.
    fn delete(&self, id: &AppointmentId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Replace an appointment; returns the stored version.
    fn update(
        &self,
        appointment: &Appointment,
    ) -> impl Future<Output = Result<Appointment, ApiError>> + Send;
}
