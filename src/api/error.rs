//! Remote appointment service errors.

/// Failure talking to the appointment service.
///
/// Keeps only owned strings so results can be cloned into store status
/// and replayed by the mock service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Cannot connect to appointment service at {0}")]
    Connection(String),
    #[error("Request to appointment service timed out")]
    Timeout,
    #[error("HTTP client error: {0}")]
    Http(String),
    #[error("Appointment service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse appointment service response: {0}")]
    ResponseParsing(String),
    #[error("Invalid appointment service URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    /// Transport-level failure (nothing came back from the service).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::Connection(_) | ApiError::Timeout | ApiError::Http(_)
        )
    }
}
