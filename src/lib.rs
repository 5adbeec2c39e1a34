pub mod api; // Remote appointment service (HTTP + mock)
pub mod config;
pub mod models;
pub mod store; // Client-side appointment store

pub use api::{ApiError, AppointmentApi, FetchScope, HttpAppointmentApi, MockAppointmentApi};
pub use config::ClientConfig;
pub use models::{
    Appointment, AppointmentId, AppointmentStatus, AppointmentTime, AppointmentType,
    BookingStatus, NewAppointment, UserId,
};
pub use store::{AppointmentStore, Operation, OperationStatus, StoreError, StoreSnapshot};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`, falling back to [`config::default_log_filter`]. Safe to
/// call more than once; later calls leave the first subscriber in place.
pub fn init_logging() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} appointments v{}", config::APP_NAME, config::APP_VERSION);
    }
}
