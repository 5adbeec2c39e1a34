use crate::models::{AppointmentId, AppointmentStatus};

/// Store-level failures.
///
/// Remote failures collapse to one fixed message per operation: transport
/// errors, non-success statuses and undecodable bodies all read the same to
/// the UI. The underlying `ApiError` is logged, never displayed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to fetch appointments")]
    FetchFailed,
    #[error("Failed to load appointment details")]
    FetchOneFailed,
    #[error("Failed to schedule appointment")]
    CreateFailed,
    #[error("Failed to cancel appointment")]
    CancelFailed,
    #[error("Failed to reschedule appointment")]
    RescheduleFailed,
    #[error("Failed to update appointment status")]
    UpdateStatusFailed,
    #[error("Appointment {0} is not in the current list")]
    NotFound(AppointmentId),
    #[error("Appointment cannot move from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("Only scheduled appointments can be rescheduled (status is {0})")]
    NotReschedulable(AppointmentStatus),
    #[error("Response discarded: a newer request of the same kind was issued")]
    Superseded,
}
